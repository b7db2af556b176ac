//! A larger stress test exercising sustained inserts under adversarial
//! patterns (sequential append, sequential prepend, and a pseudo-random
//! mix), matching SPEC_FULL §8's 50,000-insert scenario.

use strand::Rope;

// A small xorshift PRNG so this test has no external random-number
// dependency and is fully deterministic across runs.
struct Xorshift(u64);

impl Xorshift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[test]
fn fifty_thousand_sequential_appends_match_reference_string() {
    let mut rope = Rope::new();
    let mut reference = String::new();
    for i in 0..50_000u32 {
        let chunk = format!("{i}|");
        let pos = rope.byte_len();
        rope.insert_bytes(pos, chunk.as_bytes());
        reference.push_str(&chunk);
    }
    assert_eq!(rope.byte_len(), reference.len());
    assert_eq!(rope.to_string(), reference);
}

#[test]
fn fifty_thousand_sequential_prepends_match_reference_string() {
    let mut rope = Rope::new();
    let mut reference = String::new();
    for i in 0..50_000u32 {
        let chunk = format!("{i}|");
        rope.insert_bytes(0, chunk.as_bytes());
        reference = format!("{chunk}{reference}");
    }
    assert_eq!(rope.to_string(), reference);
}

#[test]
fn random_mixed_inserts_and_deletes_match_reference_string() {
    let mut rope = Rope::new();
    let mut reference = String::new();
    let mut rng = Xorshift(0x9E3779B97F4A7C15);

    for i in 0..50_000u32 {
        let op = rng.next() % 3;
        match op {
            0 | 1 => {
                let chunk = format!("{i}");
                let pos = if reference.is_empty() {
                    0
                } else {
                    (rng.next() as usize) % (reference.len() + 1)
                };
                rope.insert_bytes(pos, chunk.as_bytes());
                reference.insert_str(pos, &chunk);
            }
            _ => {
                if !reference.is_empty() {
                    let start = (rng.next() as usize) % reference.len();
                    let max_len = reference.len() - start;
                    let len = (rng.next() as usize) % (max_len + 1);
                    rope.delete_bytes(start, start + len);
                    reference.replace_range(start..start + len, "");
                }
            }
        }
    }

    assert_eq!(rope.byte_len(), reference.len());
    assert_eq!(rope.to_string(), reference);
}
