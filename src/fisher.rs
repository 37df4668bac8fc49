//! Fisher's exact test over a growable log-factorial cache.
//!
//! Grounded in the `FishersExact` inner class of the original VarScan
//! `copynumber` implementation: the same `getP` / tail-walk formulation, but
//! the cache grows by doubling on demand instead of the original's linear
//! 1,000-entry steps with a bounded retry count.

/// Cache of `ln(i!)` for `i` in `0..=capacity()`.
#[derive(Debug, Clone)]
pub struct LogFactorialTable {
    table: Vec<f64>,
}

impl LogFactorialTable {
    pub fn new(capacity: usize) -> Self {
        let mut table = Self { table: vec![0.0] };
        table.grow_to(capacity);
        table
    }

    pub fn capacity(&self) -> usize {
        self.table.len() - 1
    }

    /// Extends the cache so `ln(capacity!)` is available. A no-op if the
    /// cache already covers `capacity`.
    pub fn grow_to(&mut self, capacity: usize) {
        if capacity <= self.capacity() {
            return;
        }
        self.table.reserve(capacity + 1 - self.table.len());
        for i in self.table.len()..=capacity {
            let prev = self.table[i - 1];
            self.table.push(prev + (i as f64).ln());
        }
    }

    #[inline]
    pub fn get(&self, i: u64) -> f64 {
        self.table[i as usize]
    }
}

/// Fisher's exact test against a 2x2 contingency table, backed by a
/// [`LogFactorialTable`] that it grows as larger tables are requested.
pub struct FisherExact {
    factorials: LogFactorialTable,
}

impl FisherExact {
    pub fn new(initial_capacity: usize) -> Self {
        Self { factorials: LogFactorialTable::new(initial_capacity) }
    }

    pub fn capacity(&self) -> usize {
        self.factorials.capacity()
    }

    /// Grows the factorial cache to cover `n`, doubling rather than
    /// stepping linearly; this is the one behavior change from the
    /// original and only affects how quickly the cache reaches the
    /// requested size, never the p-value formula below.
    pub fn ensure_capacity(&mut self, n: u64) {
        let n = n as usize;
        if n > self.capacity() {
            let doubled = self.capacity().saturating_mul(2).max(64);
            self.factorials.grow_to(doubled.max(n));
        }
    }

    fn log_p(&self, a: u64, b: u64, c: u64, d: u64) -> f64 {
        let n = a + b + c + d;
        if (n as usize) > self.capacity() {
            return f64::NAN;
        }
        let f = &self.factorials;
        f.get(a + b) + f.get(c + d) + f.get(a + c) + f.get(b + d)
            - (f.get(a) + f.get(b) + f.get(c) + f.get(d) + f.get(n))
    }

    /// Probability of exactly this table under the hypergeometric
    /// distribution.
    pub fn p(&self, a: u64, b: u64, c: u64, d: u64) -> f64 {
        self.log_p(a, b, c, d).exp()
    }

    /// Cumulative probability of this table or one more extreme in the
    /// direction that shrinks `b` and `c`.
    pub fn right_tailed_p(&self, a: u64, b: u64, c: u64, d: u64) -> f64 {
        if (a + b + c + d) as usize > self.capacity() {
            return f64::NAN;
        }
        let (mut a, mut b, mut c, mut d) = (a, b, c, d);
        let mut total = self.p(a, b, c, d);
        for _ in 0..b.min(c) {
            a += 1;
            b -= 1;
            c -= 1;
            d += 1;
            total += self.p(a, b, c, d);
        }
        total
    }

    /// Cumulative probability of this table or one more extreme in the
    /// direction that shrinks `a` and `d`.
    pub fn left_tailed_p(&self, a: u64, b: u64, c: u64, d: u64) -> f64 {
        if (a + b + c + d) as usize > self.capacity() {
            return f64::NAN;
        }
        let (mut a, mut b, mut c, mut d) = (a, b, c, d);
        let mut total = self.p(a, b, c, d);
        for _ in 0..a.min(d) {
            a -= 1;
            b += 1;
            c += 1;
            d -= 1;
            total += self.p(a, b, c, d);
        }
        total
    }

    /// Sum of every table's probability that is no more likely than this
    /// one, walking both tails.
    pub fn two_tailed_p(&self, a: u64, b: u64, c: u64, d: u64) -> f64 {
        if (a + b + c + d) as usize > self.capacity() {
            return f64::NAN;
        }
        let base = self.p(a, b, c, d);
        let mut total = base;

        let (mut ra, mut rb, mut rc, mut rd) = (a, b, c, d);
        for _ in 0..b.min(c) {
            ra += 1;
            rb -= 1;
            rc -= 1;
            rd += 1;
            let p = self.p(ra, rb, rc, rd);
            if p <= base {
                total += p;
            }
        }

        let (mut la, mut lb, mut lc, mut ld) = (a, b, c, d);
        for _ in 0..a.min(d) {
            la -= 1;
            lb += 1;
            lc += 1;
            ld -= 1;
            let p = self.p(la, lb, lc, ld);
            if p <= base {
                total += p;
            }
        }

        total
    }
}

/// Right-tailed significance for a depth comparison between a running
/// segment and a candidate position, substituting the left tail when the
/// right tail saturates near 1, as the original does. Grows `fisher`'s
/// cache as needed; the doubling growth policy means this never needs the
/// original's bounded retry loop.
pub fn significance(
    fisher: &mut FisherExact,
    a: u64,
    b: u64,
    c: u64,
    d: u64,
) -> f64 {
    let n = a + b + c + d;
    fisher.ensure_capacity(n);

    let mut p = fisher.right_tailed_p(a, b, c, d);
    if p.is_nan() {
        tracing::warn!(
            a, b, c, d, n, "fisher's exact test returned NaN, treating as 1.0"
        );
        return 1.0;
    }
    if p >= 0.999 {
        let left = fisher.left_tailed_p(a, b, c, d);
        if !left.is_nan() {
            p = p.min(left);
        }
    }
    p
}
