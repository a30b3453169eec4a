use rand::Rng;

pub fn rand_str(length: usize) -> String {
    use rand::distr::Alphanumeric;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// `#rrggbb`
pub fn rand_color() -> String {
    format!("#{:06X}", rand::rng().random_range(0..=0xFFFFFFu32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rand_str() {
        let s1 = rand_str(10);
        assert_eq!(s1.len(), 10);
        let s2 = rand_str(10);
        assert_eq!(s2.len(), 10);
        assert_ne!(s1, s2)
    }

    #[test]
    fn test_rand_color() {
        let c = rand_color();
        assert_eq!(c.len(), 7);
        assert!(c.starts_with('#'));
        assert!(c[1..].chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
