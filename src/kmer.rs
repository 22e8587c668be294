//! K-mer encoding: a fixed-length DNA word packed into a `u64` radix-5 code,
//! plus the base/quality derivation used when synthesizing contig sequence.

/// Alphabet order used by the radix-5 packing. `N` is a legal base (not a
/// sentinel) because some live k-mers may have been read through an `N`.
pub const BASES: [u8; 5] = [b'A', b'C', b'G', b'T', b'N'];

/// A single k-mer, packed as a base-5 integer (one digit per base, most
/// significant digit first). Two k-mers of different `k` may collide if
/// compared directly; callers are expected to track `k` out of band (all
/// live nodes in one caller instance share the same `Config::k`).
pub type Kmer = u64;

static ENCODE_LUT: [u8; 256] = {
    let mut t = [4u8; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'G' as usize] = 2;
    t[b'g' as usize] = 2;
    t[b'T' as usize] = 3;
    t[b't' as usize] = 3;
    t
};

/// Encode a single base into its base-5 digit (`A`=0, `C`=1, `G`=2, `T`=3,
/// anything else including `N`=4).
#[inline(always)]
pub fn encode_base(b: u8) -> u64 {
    ENCODE_LUT[b as usize] as u64
}

/// Pack a slice of `k` bases into a single radix-5 `Kmer` code.
pub fn encode_kmer(bases: &[u8]) -> Kmer {
    let mut code: u64 = 0;
    for &b in bases {
        code = code * 5 + encode_base(b);
    }
    code
}

/// Unpack a `Kmer` code of length `k` back into its base sequence.
pub fn decode_kmer(code: Kmer, k: u8) -> Vec<u8> {
    let k = k as usize;
    let mut buf = vec![b'A'; k];
    let mut tmp = code;
    for pos in (0..k).rev() {
        buf[pos] = BASES[(tmp % 5) as usize];
        tmp /= 5;
    }
    buf
}

/// Derive a per-base quality value from an accumulated weight, clamped to
/// `[0, max_qual]`. Weight and quality are kept as separate scales so that
/// scoring (which uses raw weight) can evolve independently of the
/// Phred-like quality emitted in the output record.
pub fn quality_from_weight(weight: u32, max_qual: u8) -> u8 {
    weight.min(max_qual as u32) as u8
}
