use std::collections::HashMap;
use std::io::Write;
use voucher_core::{ProxyEndpoint, ProxyPool};

fn pool_of(n: usize) -> ProxyPool {
    ProxyPool::from_endpoints(
        (0..n)
            .map(|i| ProxyEndpoint {
                url: format!("http://10.0.0.{}:8080", i),
                username: None,
                password: None,
            })
            .collect(),
    )
}

#[test]
fn empty_pool_means_direct_egress() {
    let pool = ProxyPool::empty();
    assert!(pool.select().is_none());
}

#[test]
fn selection_is_roughly_uniform() {
    let pool = pool_of(4);
    let draws = 4000;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..draws {
        let picked = pool.select().expect("non-empty pool");
        *counts.entry(picked.url.clone()).or_default() += 1;
    }

    assert_eq!(counts.len(), 4);
    let expected = draws / 4;
    for (url, count) in counts {
        // Generous tolerance; expected 1000 per proxy.
        assert!(
            count > expected * 7 / 10 && count < expected * 13 / 10,
            "proxy {} picked {} times, expected ~{}",
            url,
            count,
            expected
        );
    }
}

#[test]
fn rerolls_can_differ_across_attempts() {
    let pool = pool_of(8);
    let first = pool.select().unwrap().url.clone();
    let mut saw_other = false;
    for _ in 0..200 {
        if pool.select().unwrap().url != first {
            saw_other = true;
            break;
        }
    }
    assert!(saw_other);
}

#[test]
fn loads_and_skips_malformed_lines() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# staging proxies").unwrap();
    writeln!(file, "10.0.0.1:3128").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "10.0.0.2:3128:alice:hunter2").unwrap();
    writeln!(file, "notaproxy").unwrap();
    writeln!(file, "socks5://10.0.0.3:1080").unwrap();
    file.flush().unwrap();

    let pool = ProxyPool::load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(pool.len(), 3);

    let urls: Vec<String> = (0..200)
        .filter_map(|_| pool.select().map(|p| p.url.clone()))
        .collect();
    assert!(urls.iter().any(|u| u == "http://10.0.0.1:3128"));
    assert!(urls.iter().any(|u| u == "socks5://10.0.0.3:1080"));
}

#[test]
fn missing_file_yields_empty_pool() {
    let pool = ProxyPool::load("no/such/proxies.txt").unwrap();
    assert!(pool.is_empty());
}
