use chrono::Utc;
use rand::{Rng, seq::IndexedRandom};

const METHODS: [(&str, u8); 5] = [
    ("GET", 6),
    ("POST", 2),
    ("PUT", 1),
    ("DELETE", 1),
    ("HEAD", 1),
];
const PATHS: [(&str, u8); 6] = [
    ("/", 10),
    ("/login", 10),
    ("/api/orders?page=2", 50),
    ("/admin", 5),
    ("/splash#top", 20),
    ("/gallery", 10),
];
const STATUS: [(u16, u8); 6] = [
    (200, 50),
    (201, 10),
    (400, 10),
    (401, 20),
    (404, 50),
    (500, 5),
];
const HOSTNAMES: [(&str, u8); 3] = [
    ("api.example.com", 5),
    ("www.example.com", 10),
    ("static-1.cdn.example.net", 2),
];
const AGENTS: [&str; 3] = ["\"curl/8.5.0\"", "\"Mozilla/5.0\"", "\"-\""];

fn address<R: Rng + ?Sized>(rng: &mut R, net: &str) -> String {
    format!(
        "{net}.{}.{}",
        rng.random_range(0..256),
        rng.random_range(1..255)
    )
}

/// Upstream time in milliseconds, roughly one in twenty above the 2s mark.
fn upstream_ms<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.random_ratio(1, 20) {
        rng.random_range(2001..8000)
    } else {
        rng.random_range(1..400)
    }
}

pub fn generate_gateway_log<R: Rng + ?Sized>(rng: &mut R) -> String {
    let ts = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    let client = address(rng, "192.168");
    let host = address(rng, "10.0");
    let hostname = HOSTNAMES.choose_weighted(rng, |(_, w)| *w).unwrap().0;
    let method = METHODS.choose_weighted(rng, |(_, w)| *w).unwrap().0;
    let path = PATHS.choose_weighted(rng, |(_, w)| *w).unwrap().0;
    let upstream = upstream_ms(rng);
    let status = STATUS.choose_weighted(rng, |(_, w)| *w).unwrap().0;
    let size = rng.random_range(100..2000);
    let agent = AGENTS.choose(rng).unwrap();

    format!(
        "{ts} {client} {host} {hostname} {method} {path} HTTP/1.1 {upstream} {status} {size} {agent}"
    )
}

pub fn generate_minimal_log<R: Rng + ?Sized>(rng: &mut R) -> String {
    let client = address(rng, "192.168");
    let method = METHODS.choose_weighted(rng, |(_, w)| *w).unwrap().0;
    let path = PATHS.choose_weighted(rng, |(_, w)| *w).unwrap().0;
    let status = STATUS.choose_weighted(rng, |(_, w)| *w).unwrap().0;

    format!("{client} {method} {path} HTTP/1.1 {status} -")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn gateway_log_has_two_bare_numbers_before_the_size() {
        let mut rng = StdRng::seed_from_u64(7);
        let line = generate_gateway_log(&mut rng);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(tokens.len(), 11);
        assert!(tokens[7].parse::<u32>().is_ok());
        assert!(tokens[8].parse::<u16>().is_ok());
        assert!(tokens[9].parse::<u32>().is_ok());
    }

    #[test]
    fn minimal_log_has_status_before_trailer() {
        let mut rng = StdRng::seed_from_u64(7);
        let line = generate_minimal_log(&mut rng);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(tokens.len(), 6);
        assert!(tokens[4].parse::<u16>().is_ok());
        assert_eq!(tokens[5], "-");
    }
}
