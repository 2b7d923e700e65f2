use super::galois::GaloisField;
use crate::error::{Error, Result};

// Reed-Solomon codec
//------------------------------------------------------------------------------

// Systematic Reed-Solomon codec over GF(2^symsize). The generator polynomial
// is the product of (x - alpha^(fcr + i * prim)) for i in [0, nroots), so a
// valid codeword evaluates to zero at every root alpha^(fcr + i * prim).
//
// Codewords are laid out data-first with the coefficient of the highest power
// of x at index 0, followed by nroots parity symbols. Shortened codewords
// (fewer than total_size() symbols) decode as if left-padded with zeros.
#[derive(Debug, Clone)]
pub struct ReedSolomon {
    gf: GaloisField,
    fcr: usize,
    prim: usize,
    nroots: usize,
    // Monic, highest power first
    genpoly: Vec<u8>,
}

impl ReedSolomon {
    /// Panics when the parameters cannot form a valid code: `symsize`
    /// outside [2, 8], `nroots` not below the field order, or `prim` not
    /// coprime with it. For `symsize < 8` every data symbol must fit in
    /// `symsize` bits.
    pub fn new(symsize: u32, fcr: usize, prim: usize, nroots: usize) -> Self {
        let gf = GaloisField::new(symsize);
        assert!(nroots > 0 && nroots < gf.nn(), "parity count out of range: {nroots}");
        assert!(
            prim > 0 && prim < gf.nn() && gcd(prim, gf.nn()) == 1,
            "primitive element exponent must be coprime with {}: {prim}",
            gf.nn()
        );

        let mut genpoly = vec![1u8];
        for i in 0..nroots {
            let root = gf.exp(fcr + i * prim);
            genpoly = gf.poly_mul(&genpoly, &[root, 1]);
        }
        genpoly.reverse();

        Self { gf, fcr, prim, nroots, genpoly }
    }

    // Read-only configuration queries
    //--------------------------------------------------------------------------

    pub fn max_errors(&self) -> usize {
        self.nroots / 2
    }

    pub fn parity_size(&self) -> usize {
        self.nroots
    }

    // Largest number of data symbols a full-length codeword can carry
    pub fn data_size(&self) -> usize {
        self.gf.nn() - self.nroots
    }

    // Full-length codeword size
    pub fn total_size(&self) -> usize {
        self.gf.nn()
    }

    // Encoder
    //--------------------------------------------------------------------------

    /// Appends `parity_size()` parity symbols to `data`. The data portion of
    /// the output is byte-identical to the input.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() > self.data_size() {
            return Err(Error::DataTooLong);
        }

        // Long division of data(x) * x^nroots by the generator polynomial.
        // The quotient accumulates in the data positions and is discarded;
        // the remainder left in the tail is the parity.
        let mut rem = data.to_vec();
        rem.resize(data.len() + self.nroots, 0);
        for i in 0..data.len() {
            let coeff = rem[i];
            if coeff == 0 {
                continue;
            }
            for (j, &g) in self.genpoly.iter().enumerate().skip(1) {
                rem[i + j] ^= self.gf.mul(g, coeff);
            }
        }

        let mut out = data.to_vec();
        out.extend_from_slice(&rem[data.len()..]);
        Ok(out)
    }

    /// Encodes a buffer of arbitrary length as consecutive full-length
    /// codewords, zero-padding the final data block. The output length is
    /// always a multiple of `total_size()`.
    pub fn encode_blocks(&self, data: &[u8]) -> Result<Vec<u8>> {
        let blocks = data.len().div_ceil(self.data_size()).max(1);
        let mut out = Vec::with_capacity(blocks * self.total_size());
        let mut padded = vec![0u8; self.data_size()];
        for block in data.chunks(self.data_size()) {
            padded[..block.len()].copy_from_slice(block);
            padded[block.len()..].fill(0);
            out.extend_from_slice(&self.encode(&padded)?);
        }
        Ok(out)
    }

    /// Inverse of [`encode_blocks`](Self::encode_blocks): decodes consecutive
    /// full-length codewords and concatenates their data portions, padding
    /// included. Trailing bytes that do not fill a codeword are ignored.
    pub fn decode_blocks(&self, received: &[u8]) -> Result<Vec<u8>> {
        if received.len() < self.total_size() {
            return Err(Error::InvalidLength);
        }
        let mut out = Vec::with_capacity(received.len() / self.total_size() * self.data_size());
        for block in received.chunks_exact(self.total_size()) {
            out.extend_from_slice(&self.decode(block, &[])?);
        }
        Ok(out)
    }

    // Decoder
    //--------------------------------------------------------------------------

    /// Corrects up to `max_errors()` symbol errors (fewer when erasures are
    /// declared; 2*errors + erasures must stay within `parity_size()`) and
    /// returns the corrected data portion. Erasures are byte offsets into
    /// `received`.
    pub fn decode(&self, received: &[u8], erasures: &[usize]) -> Result<Vec<u8>> {
        let len = received.len();
        if len <= self.nroots || len > self.total_size() {
            return Err(Error::InvalidLength);
        }

        let synd = self.syndromes(received);
        if synd.iter().all(|&s| s == 0) {
            return Ok(received[..len - self.nroots].to_vec());
        }

        let mut eras: Vec<usize> = erasures.to_vec();
        eras.sort_unstable();
        eras.dedup();
        if eras.len() > self.nroots {
            return Err(Error::TooManyErrors);
        }
        if eras.iter().any(|&e| e >= len) {
            return Err(Error::InvalidLength);
        }

        let nn = self.gf.nn();

        // Erasure locator: product of (1 - X_e x) over the declared positions,
        // where X_e = alpha^(prim * p) and p is the power of x at that offset
        let mut gamma = vec![1u8];
        for &e in &eras {
            let p = len - 1 - e;
            gamma = self.gf.poly_mul(&gamma, &[1, self.gf.exp(self.prim * p)]);
        }

        // Forney syndromes fold the erasure contributions out of the syndrome
        // sequence, leaving a sequence the key equation solver can treat as
        // errors-only
        let eps = eras.len();
        let folded = self.gf.poly_mul(&synd, &gamma);
        let fsynd = &folded[eps..self.nroots];

        let lambda = self.berlekamp_massey(fsynd);
        let nu = lambda.iter().rposition(|&c| c != 0).unwrap_or(0);
        if 2 * nu + eps > self.nroots {
            return Err(Error::TooManyErrors);
        }

        // Errata locator covers errors and erasures alike
        let mut psi = self.gf.poly_mul(&lambda, &gamma);
        if let Some(deg) = psi.iter().rposition(|&c| c != 0) {
            psi.truncate(deg + 1);
        }
        let deg_psi = psi.len() - 1;

        // Chien search over every power of x present in the received block
        let mut errata = Vec::with_capacity(deg_psi);
        for p in 0..len {
            let xinv = self.gf.exp(nn - (self.prim * p) % nn);
            if self.gf.poly_eval(&psi, xinv) == 0 {
                errata.push(p);
            }
        }
        if errata.len() != deg_psi {
            return Err(Error::TooManyErrors);
        }

        // Error evaluator and the formal derivative of the errata locator
        let mut omega = self.gf.poly_mul(&synd, &psi);
        omega.truncate(self.nroots);
        let mut dpsi = vec![0u8; deg_psi.max(1)];
        for i in (1..psi.len()).step_by(2) {
            dpsi[i - 1] = psi[i];
        }

        // Forney magnitudes, XORed into the received symbols
        let mut corrected = received.to_vec();
        for &p in &errata {
            let xinv = self.gf.exp(nn - (self.prim * p) % nn);
            let num = self.gf.poly_eval(&omega, xinv);
            let den = self.gf.poly_eval(&dpsi, xinv);
            if den == 0 {
                return Err(Error::TooManyErrors);
            }
            let y = self.gf.mul(self.gf.exp(self.prim * p), self.gf.div(num, den));
            let mag = self.gf.mul(y, self.gf.exp(nn - (self.fcr * p) % nn));
            corrected[len - 1 - p] ^= mag;
        }

        if self.syndromes(&corrected).iter().any(|&s| s != 0) {
            return Err(Error::TooManyErrors);
        }

        corrected.truncate(len - self.nroots);
        Ok(corrected)
    }

    // Syndrome i evaluates the received polynomial at alpha^(fcr + i * prim)
    fn syndromes(&self, received: &[u8]) -> Vec<u8> {
        (0..self.nroots)
            .map(|i| {
                let root = self.gf.exp(self.fcr + i * self.prim);
                received.iter().fold(0u8, |acc, &b| self.gf.mul(acc, root) ^ b)
            })
            .collect()
    }

    // Massey's LFSR synthesis over the folded syndrome sequence; returns the
    // error locator with coefficients in ascending order of degree
    fn berlekamp_massey(&self, synd: &[u8]) -> Vec<u8> {
        let mut cx = vec![0u8; synd.len() + 1];
        let mut bx = vec![0u8; synd.len() + 1];
        cx[0] = 1;
        bx[0] = 1;

        let mut l = 0usize;
        let mut m = 1usize;
        let mut b = 1u8;

        for n in 0..synd.len() {
            let mut delta = synd[n];
            for i in 1..=l {
                delta ^= self.gf.mul(cx[i], synd[n - i]);
            }

            if delta == 0 {
                m += 1;
                continue;
            }

            let scale = self.gf.div(delta, b);
            if 2 * l <= n {
                let tx = cx.clone();
                for i in 0..bx.len() - m {
                    cx[i + m] ^= self.gf.mul(scale, bx[i]);
                }
                bx = tx;
                l = n + 1 - l;
                b = delta;
                m = 1;
            } else {
                for i in 0..bx.len() - m {
                    cx[i + m] ^= self.gf.mul(scale, bx[i]);
                }
                m += 1;
            }
        }
        cx
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod rs_tests {
    use super::ReedSolomon;
    use crate::error::Error;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(4; "four roots")]
    #[test_case(16; "sixteen roots")]
    #[test_case(32; "thirty two roots")]
    fn test_encode_is_systematic(nroots: usize) {
        let rs = ReedSolomon::new(8, 1, 1, nroots);
        let data: Vec<u8> = (0..50u8).collect();
        let encoded = rs.encode(&data).unwrap();
        assert_eq!(encoded.len(), data.len() + nroots);
        assert_eq!(&encoded[..data.len()], &data[..]);
    }

    #[test]
    fn test_encoded_block_has_zero_syndromes() {
        let rs = ReedSolomon::new(8, 1, 1, 8);
        let data = b"the quick brown fox jumps over the lazy dog";
        let encoded = rs.encode(data).unwrap();
        assert_eq!(rs.decode(&encoded, &[]).unwrap(), data);
    }

    #[test]
    fn test_config_queries() {
        let rs = ReedSolomon::new(8, 1, 1, 32);
        assert_eq!(rs.max_errors(), 16);
        assert_eq!(rs.total_size(), 255);
        assert_eq!(rs.data_size(), 223);
    }

    #[test]
    fn test_data_too_long() {
        let rs = ReedSolomon::new(8, 1, 1, 32);
        let data = vec![0u8; rs.data_size() + 1];
        assert_eq!(rs.encode(&data), Err(Error::DataTooLong));
    }

    #[test]
    fn test_decode_short_input() {
        let rs = ReedSolomon::new(8, 1, 1, 16);
        assert_eq!(rs.decode(&[1, 2, 3], &[]), Err(Error::InvalidLength));
    }

    #[test_case(&[0], &[0x01]; "single error at start")]
    #[test_case(&[10], &[0xff]; "single error in the middle")]
    #[test_case(&[3, 17, 40], &[0x55, 0x80, 0x07]; "three errors")]
    #[test_case(&[0, 1, 2, 3, 4, 5, 6, 7], &[9, 9, 9, 9, 9, 9, 9, 9]; "max errors")]
    fn test_decode_corrects_errors(positions: &[usize], flips: &[u8]) {
        let rs = ReedSolomon::new(8, 1, 1, 16);
        let data: Vec<u8> = (0u8..48).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect();
        let mut received = rs.encode(&data).unwrap();
        for (&p, &f) in positions.iter().zip(flips) {
            received[p] ^= f;
        }
        assert_eq!(rs.decode(&received, &[]).unwrap(), data);
    }

    #[test]
    fn test_decode_corrects_full_erasure_budget() {
        let rs = ReedSolomon::new(8, 1, 1, 8);
        let data: Vec<u8> = (0u8..40).collect();
        let mut received = rs.encode(&data).unwrap();
        let erasures: Vec<usize> = vec![1, 5, 9, 13, 17, 21, 25, 29];
        for &e in &erasures {
            received[e] = 0;
        }
        assert_eq!(rs.decode(&received, &erasures).unwrap(), data);
    }

    #[test]
    fn test_decode_corrects_mixed_errata() {
        // 2 errors + 4 erasures within an 8-root budget
        let rs = ReedSolomon::new(8, 1, 1, 8);
        let data: Vec<u8> = (0u8..60).rev().collect();
        let mut received = rs.encode(&data).unwrap();
        received[2] ^= 0xaa;
        received[33] ^= 0x13;
        let erasures = vec![7, 8, 20, 41];
        for &e in &erasures {
            received[e] = 0xff;
        }
        assert_eq!(rs.decode(&received, &erasures).unwrap(), data);
    }

    #[test]
    fn test_erasure_budget_exceeded() {
        let rs = ReedSolomon::new(8, 1, 1, 4);
        let data: Vec<u8> = (0u8..20).collect();
        let mut received = rs.encode(&data).unwrap();
        received[0] ^= 1;
        let erasures: Vec<usize> = (0..5).collect();
        assert_eq!(rs.decode(&received, &erasures), Err(Error::TooManyErrors));
    }

    #[test]
    fn test_block_stream_roundtrip_with_errors() {
        let rs = ReedSolomon::new(8, 1, 1, 32);
        let data: Vec<u8> = (0..500u32).map(|i| (i % 256) as u8).collect();
        let mut stream = rs.encode_blocks(&data).unwrap();
        assert_eq!(stream.len(), 3 * rs.total_size());

        stream[10] ^= 0xff;
        stream[300] ^= 0x1d;
        stream[600] ^= 0x77;
        let decoded = rs.decode_blocks(&stream).unwrap();
        assert_eq!(&decoded[..data.len()], &data[..]);
        assert!(decoded[data.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_blocks_needs_one_codeword() {
        let rs = ReedSolomon::new(8, 1, 1, 32);
        let short = vec![0u8; rs.total_size() - 1];
        assert_eq!(rs.decode_blocks(&short), Err(Error::InvalidLength));
    }

    #[test]
    fn test_overload_never_returns_original() {
        let rs = ReedSolomon::new(8, 1, 1, 4);
        let data: Vec<u8> = (0u8..30).collect();
        let mut received = rs.encode(&data).unwrap();
        // Three errors against a two-error budget: either the decoder reports
        // failure or it lands on some other codeword, never the original
        received[1] ^= 0x21;
        received[12] ^= 0x84;
        received[25] ^= 0x5a;
        assert_ne!(rs.decode(&received, &[]), Ok(data));
    }

    #[test]
    fn test_alternate_field_and_roots() {
        let rs = ReedSolomon::new(6, 1, 1, 6);
        let data: Vec<u8> = (0u8..20).map(|i| i % 63).collect();
        let mut received = rs.encode(&data).unwrap();
        received[4] ^= 0x3f;
        received[19] ^= 0x11;
        assert_eq!(rs.decode(&received, &[]).unwrap(), data);
    }

    #[test]
    fn test_nonunit_fcr_and_prim() {
        let rs = ReedSolomon::new(8, 112, 11, 10);
        let data: Vec<u8> = (0u8..80).map(|i| i.wrapping_mul(101)).collect();
        let mut received = rs.encode(&data).unwrap();
        received[0] ^= 0x40;
        received[44] ^= 0x0e;
        received[79] ^= 0xd1;
        assert_eq!(rs.decode(&received, &[]).unwrap(), data);
    }

    proptest! {
        #[test]
        fn proptest_roundtrip_with_errors(
            data in prop::collection::vec(any::<u8>(), 1..200),
            seed in any::<u64>(),
        ) {
            let rs = ReedSolomon::new(8, 1, 1, 16);
            let encoded = rs.encode(&data).unwrap();
            let mut received = encoded.clone();

            // Up to max_errors() corruptions at distinct positions
            let mut state = seed | 1;
            let mut positions = std::collections::HashSet::new();
            for _ in 0..rs.max_errors() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                positions.insert((state >> 33) as usize % received.len());
            }
            for &p in &positions {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                received[p] ^= ((state >> 33) as u8) | 1;
            }

            prop_assert_eq!(rs.decode(&received, &[]).unwrap(), data);
        }
    }
}
