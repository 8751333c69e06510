//! Whitelisted math functions available to rule expressions.
//!
//! Generated group files glob-import this module, so an expression written as
//! `sqrt(pressure) > 2 * abs(drift)` compiles without the author naming any
//! paths. The set here must stay in lockstep with the compiler's whitelist:
//! anything the compiler exempts from sensor lookup has to exist here, and
//! nothing else should.

pub fn abs(v: f64) -> f64 {
    v.abs()
}

pub fn ceil(v: f64) -> f64 {
    v.ceil()
}

pub fn cos(v: f64) -> f64 {
    v.cos()
}

pub fn exp(v: f64) -> f64 {
    v.exp()
}

pub fn floor(v: f64) -> f64 {
    v.floor()
}

/// Natural logarithm.
pub fn log(v: f64) -> f64 {
    v.ln()
}

pub fn pow(base: f64, exponent: f64) -> f64 {
    base.powf(exponent)
}

pub fn round(v: f64) -> f64 {
    v.round()
}

pub fn sin(v: f64) -> f64 {
    v.sin()
}

pub fn sqrt(v: f64) -> f64 {
    v.sqrt()
}

pub fn tan(v: f64) -> f64 {
    v.tan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn functions_delegate_to_f64() {
        assert_eq!(abs(-3.0), 3.0);
        assert_eq!(pow(2.0, 10.0), 1024.0);
        assert_eq!(sqrt(81.0), 9.0);
        assert_eq!(floor(2.9), 2.0);
        assert_eq!(ceil(2.1), 3.0);
        assert_eq!(round(2.5), 3.0);
        assert!((log(exp(1.0)) - 1.0).abs() < 1e-12);
        assert!((sin(0.0)).abs() < 1e-12);
        assert_eq!(cos(0.0), 1.0);
        assert!((tan(0.0)).abs() < 1e-12);
    }
}
