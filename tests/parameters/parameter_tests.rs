//! Tests for the Parameter struct

use approx::assert_relative_eq;
use simfit_rs::parameters::{Parameter, ParameterError};

#[test]
fn test_normalization_inverse() {
    let mut param = Parameter::new("x", 5.0, 0.0, 10.0).unwrap();
    assert_relative_eq!(param.get_value(true), 0.5);

    param.set_value(0.2, true).unwrap();
    assert_relative_eq!(param.value(), 2.0);

    param.set_value(0.5, true).unwrap();
    assert_relative_eq!(param.value(), 5.0);
}

#[test]
fn test_defaults() {
    let param = Parameter::new("x", 1.0, 0.0, 10.0).unwrap();
    assert_relative_eq!(param.step_size(), 1.0);
    assert_eq!(param.decimal_places(), 1);
    assert!(!param.is_free());
    assert!(param.is_dirty());
    assert!(param.bounds_checking());
}

#[test]
fn test_out_of_bounds_is_rejected() {
    let mut param = Parameter::new("x", 5.0, 0.0, 10.0).unwrap();

    let err = param.set_value(11.0, false).unwrap_err();
    assert!(matches!(err, ParameterError::Bounds { .. }));
    assert_relative_eq!(param.value(), 5.0);

    assert!(param.set_value(1.5, true).is_err());
    assert!(param.set_value(f64::NAN, false).is_err());
    assert_relative_eq!(param.value(), 5.0);
}

#[test]
fn test_bounds_checking_can_be_disabled() {
    let mut param = Parameter::new("x", 5.0, 0.0, 10.0).unwrap();
    param.set_bounds_checking(false);
    param.set_value(20.0, false).unwrap();
    assert_relative_eq!(param.value(), 20.0);

    param.set_bounds_checking(true);
    assert!(param.set_value(30.0, false).is_err());
}

#[test]
fn test_bounds_that_exclude_the_value_are_rejected() {
    let mut param = Parameter::new("x", 5.0, 0.0, 10.0).unwrap();
    assert!(param.set_max(4.0).is_err());
    assert!(param.set_min(6.0).is_err());
    assert_relative_eq!(param.max(), 10.0);

    param.set_bounds(2.0, 8.0).unwrap();
    assert_relative_eq!(param.get_value(true), 0.5);
}

#[test]
fn test_check_value_does_not_modify() {
    let param = Parameter::new("x", 5.0, 0.0, 10.0).unwrap();
    assert_relative_eq!(param.check_value(0.25, true).unwrap(), 2.5);
    assert!(param.check_value(-1.0, false).is_err());
    assert_relative_eq!(param.value(), 5.0);
}

#[test]
fn test_clear_flags() {
    let mut param = Parameter::new("x", 5.0, 0.0, 10.0).unwrap();
    param.clear_flags();
    assert!(!param.is_dirty());

    param.set_value(6.0, false).unwrap();
    assert!(param.is_dirty());
}
