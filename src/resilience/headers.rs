use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

const ACCEPT_VARIANTS: &[&str] = &[
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
];

const ACCEPT_LANGUAGE_VARIANTS: &[&str] = &[
    "en-US,en;q=0.9",
    "en-US,en;q=0.8",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.5",
];

/// Baseline headers every session starts with
pub fn baseline_headers() -> BTreeMap<String, String> {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Accept-Encoding", "gzip, deflate"),
        ("Connection", "keep-alive"),
        ("Upgrade-Insecure-Requests", "1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Generates a browser-like header set with randomized values
///
/// Accept, Accept-Language and DNT vary per call. Cache-Control is added
/// 30% of the time and the `Sec-Fetch-*` trio 20% of the time.
pub fn generate_random_headers<R: Rng + ?Sized>(rng: &mut R) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    let mut set = |name: &str, value: &str| {
        headers.insert(name.to_string(), value.to_string());
    };

    set("Accept", pick(rng, ACCEPT_VARIANTS));
    set("Accept-Language", pick(rng, ACCEPT_LANGUAGE_VARIANTS));
    set("Accept-Encoding", "gzip, deflate, br");
    set("DNT", pick(rng, &["1", "0"]));
    set("Connection", "keep-alive");
    set("Upgrade-Insecure-Requests", "1");

    if rng.gen_bool(0.3) {
        set("Cache-Control", "max-age=0");
    }

    if rng.gen_bool(0.2) {
        set("Sec-Fetch-Dest", pick(rng, &["document", "empty"]));
        set("Sec-Fetch-Mode", pick(rng, &["navigate", "cors"]));
        set("Sec-Fetch-Site", pick(rng, &["none", "same-origin"]));
    }

    headers
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, options: &[&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}
