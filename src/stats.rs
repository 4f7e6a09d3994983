//! Descriptive statistics and two-sample hypothesis testing over benchmark
//! sample series.

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N); 0.0 for fewer than 2 samples
pub fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Two-sample test outcome, before significance is judged against a
/// confidence level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoSampleTest {
    pub test_name: &'static str,
    pub statistic: f64,
    pub p_value: f64,
    pub degrees_of_freedom: f64,
}

/// Compare two sample means given their summary statistics.
///
/// Welch's variant does not assume equal variances and uses the
/// Welch-Satterthwaite degrees of freedom; the pooled variant is the classic
/// Student's t-test with df = n1 + n2 - 2.
///
/// Degenerate inputs resolve to defined values instead of NaN: with fewer
/// than 2 samples on either side the test cannot reject (p = 1); with zero
/// variance on both sides and differing means the difference is treated as
/// maximally significant (p = 0).
pub fn two_sample_t_test(
    mean1: f64,
    sd1: f64,
    n1: usize,
    mean2: f64,
    sd2: f64,
    n2: usize,
    use_welch: bool,
) -> TwoSampleTest {
    let test_name = if use_welch {
        "Welch's t-test"
    } else {
        "Student's t-test"
    };

    if n1 < 2 || n2 < 2 {
        return TwoSampleTest {
            test_name,
            statistic: 0.0,
            p_value: 1.0,
            degrees_of_freedom: 0.0,
        };
    }

    let nf1 = n1 as f64;
    let nf2 = n2 as f64;
    let var1 = sd1 * sd1;
    let var2 = sd2 * sd2;

    let (se, df) = if use_welch {
        let se_sq = var1 / nf1 + var2 / nf2;
        let num = se_sq * se_sq;
        let den = (var1 / nf1).powi(2) / (nf1 - 1.0) + (var2 / nf2).powi(2) / (nf2 - 1.0);
        let df = if den > 0.0 { num / den } else { 0.0 };
        (se_sq.sqrt(), df)
    } else {
        let pooled_var = ((nf1 - 1.0) * var1 + (nf2 - 1.0) * var2) / (nf1 + nf2 - 2.0);
        let se = (pooled_var * (1.0 / nf1 + 1.0 / nf2)).sqrt();
        (se, nf1 + nf2 - 2.0)
    };

    if se == 0.0 {
        // No within-sample variation on either side
        if mean1 == mean2 {
            return TwoSampleTest {
                test_name,
                statistic: 0.0,
                p_value: 1.0,
                degrees_of_freedom: nf1 + nf2 - 2.0,
            };
        }
        let statistic = if mean1 > mean2 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        };
        return TwoSampleTest {
            test_name,
            statistic,
            p_value: 0.0,
            degrees_of_freedom: nf1 + nf2 - 2.0,
        };
    }

    let statistic = (mean1 - mean2) / se;
    let p_value = student_t_two_tailed(statistic.abs(), df);

    TwoSampleTest {
        test_name,
        statistic,
        p_value,
        degrees_of_freedom: df,
    }
}

/// Two-tailed p-value for Student's t-distribution with `df` degrees of
/// freedom, via the identity P(|T| > t) = I_{df/(df+t^2)}(df/2, 1/2)
pub fn student_t_two_tailed(t: f64, df: f64) -> f64 {
    if df <= 0.0 {
        return 1.0;
    }
    // For large df the t-distribution is effectively normal
    if df > 100.0 {
        return (2.0 * normal_cdf(-t.abs())).clamp(0.0, 1.0);
    }

    let x = df / (df + t * t);
    regularized_beta(x, df / 2.0, 0.5).clamp(0.0, 1.0)
}

/// Cohen's d effect size: (mean2 - mean1) over the sample-size-weighted
/// pooled standard deviation. Falls back to the plain average of the two
/// standard deviations when n1 + n2 <= 2, and to 0 when the pooled spread
/// itself is 0.
pub fn cohens_d(mean1: f64, sd1: f64, n1: usize, mean2: f64, sd2: f64, n2: usize) -> f64 {
    let nf1 = n1 as f64;
    let nf2 = n2 as f64;

    let pooled_sd = if n1 + n2 > 2 {
        (((nf1 - 1.0) * sd1 * sd1 + (nf2 - 1.0) * sd2 * sd2) / (nf1 + nf2 - 2.0)).sqrt()
    } else {
        (sd1 + sd2) / 2.0
    };

    if pooled_sd == 0.0 {
        return 0.0;
    }

    (mean2 - mean1) / pooled_sd
}

/// Conventional interpretation bands for |d|
pub fn interpret_effect_size(d: f64) -> &'static str {
    let magnitude = d.abs();
    if magnitude < 0.2 {
        "negligible"
    } else if magnitude < 0.5 {
        "small"
    } else if magnitude < 0.8 {
        "medium"
    } else {
        "large"
    }
}

/// Standard normal CDF via the Abramowitz & Stegun polynomial approximation
fn normal_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let t = 1.0 / (1.0 + 0.2316419 * x.abs());
    let d = 0.3989422804014327; // 1/sqrt(2*pi)
    let p = d * (-x * x / 2.0).exp();
    let c = t
        * (0.319381530
            + t * (-0.356563782 + t * (1.781477937 + t * (-1.821255978 + t * 1.330274429))));

    if x >= 0.0 { 1.0 - p * c } else { p * c }
}

/// Regularized incomplete beta function I_x(a, b).
///
/// Continued-fraction evaluation (Lentz), switching to the symmetric form
/// I_x(a, b) = 1 - I_{1-x}(b, a) when x lies past the convergence boundary.
fn regularized_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

/// Lentz's continued fraction for the incomplete beta function
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    let mut c = 1.0f64;
    let mut d = 1.0 - (a + b) * x / (a + 1.0);
    if d.abs() < 1e-30 {
        d = 1e-30;
    }
    d = 1.0 / d;
    let mut f = d;

    for m in 1..200 {
        let m = m as f64;

        // Even step
        let an = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 + an * d;
        if d.abs() < 1e-30 {
            d = 1e-30;
        }
        c = 1.0 + an / c;
        if c.abs() < 1e-30 {
            c = 1e-30;
        }
        d = 1.0 / d;
        f *= d * c;

        // Odd step
        let an = -(a + m) * (a + b + m) * x / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 + an * d;
        if d.abs() < 1e-30 {
            d = 1e-30;
        }
        c = 1.0 + an / c;
        if c.abs() < 1e-30 {
            c = 1e-30;
        }
        d = 1.0 / d;
        let delta = d * c;
        f *= delta;

        if (delta - 1.0).abs() < 1e-10 {
            break;
        }
    }

    f
}

/// Lanczos approximation for ln(Gamma(x))
fn ln_gamma(x: f64) -> f64 {
    let coeffs = [
        76.18009172947146,
        -86.50532032941677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];

    let y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut ser = 1.000000000190015f64;
    for (i, c) in coeffs.iter().enumerate() {
        ser += c / (y + 1.0 + i as f64);
    }
    -tmp + (2.5066282746310005 * ser / x).ln()
}
