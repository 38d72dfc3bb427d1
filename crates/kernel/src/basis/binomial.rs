//! Binomial coefficients through a memoized table of `ln(n!)`.
//!
//! The table only grows, one entry per `n`, and each entry is written once.
//! [`BinomialCache`] is an ordinary value that callers may own; the free
//! function [`binomial`] uses a thread-local instance so no lock is shared
//! between threads.

use std::cell::RefCell;

/// Lanczos approximation of `ln(Gamma(x))` for `x > 0`.
fn gammaln(x: f64) -> f64 {
    const COF: [f64; 6] = [
        76.18009172947146,
        -86.50532032291677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut ser = 1.000000000190015;
    for c in COF {
        y += 1.0;
        ser += c / y;
    }
    -tmp + (2.5066282746310005 * ser / x).ln()
}

/// Growing table of `ln(n!)`.
#[derive(Debug, Clone, Default)]
pub struct BinomialCache {
    /// `ln_fact[n] = ln(n!)`; entries 0 and 1 are exact zeros.
    ln_fact: Vec<f64>,
}

impl BinomialCache {
    pub fn new() -> Self {
        Self {
            ln_fact: vec![0.0, 0.0],
        }
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.ln_fact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ln_fact.is_empty()
    }

    /// `ln(n!)`, extending the table up to `n` if needed.
    pub fn ln_factorial(&mut self, n: usize) -> f64 {
        if n <= 1 {
            return 0.0;
        }
        if self.ln_fact.len() < 2 {
            self.ln_fact = vec![0.0, 0.0];
        }
        while self.ln_fact.len() <= n {
            let k = self.ln_fact.len();
            self.ln_fact.push(gammaln(k as f64 + 1.0));
        }
        self.ln_fact[n]
    }

    /// The binomial coefficient `n over k`, zero when `k > n`.
    pub fn binomial(&mut self, n: usize, k: usize) -> f64 {
        if k > n {
            return 0.0;
        }
        let ln = self.ln_factorial(n) - self.ln_factorial(k) - self.ln_factorial(n - k);
        (0.5 + ln.exp()).floor()
    }
}

thread_local! {
    static CACHE: RefCell<BinomialCache> = RefCell::new(BinomialCache::new());
}

/// The binomial coefficient `n over k` from this thread's cache.
pub fn binomial(n: usize, k: usize) -> f64 {
    CACHE.with(|cache| cache.borrow_mut().binomial(n, k))
}
