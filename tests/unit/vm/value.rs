use super::*;

#[test]
fn coercion_never_panics_and_degrades_to_defaults() {
    assert!(Value::Undefined.to_number().is_nan());
    assert_eq!(Value::Null.to_number(), 0.0);
    assert_eq!(Value::Bool(true).to_number(), 1.0);
    assert_eq!(Value::string(" 42 ").to_number(), 42.0);
    assert!(Value::string("abc").to_number().is_nan());
    assert!(Value::string("inf").to_number().is_nan());
    assert_eq!(Value::string("0x1F").to_number(), 31.0);
    assert_eq!(Value::string("").to_number(), 0.0);
    assert_eq!(Value::string("1e3").to_number(), 1000.0);
}

#[test]
fn legacy_numbers_zero_out_non_numeric() {
    assert_eq!(Value::Undefined.legacy_to_number(), 0.0);
    assert_eq!(Value::string("x").legacy_to_number(), 0.0);
    assert_eq!(Value::Bool(true).to_number_for(4), 1.0);
    assert!(Value::Undefined.to_number_for(6).is_nan());
}

#[test]
fn truthiness() {
    assert!(!Value::Undefined.to_boolean());
    assert!(!Value::Number(f64::NAN).to_boolean());
    assert!(!Value::string("").to_boolean());
    assert!(Value::string("0").to_boolean());
    assert!(Value::Number(-1.0).to_boolean());
}

#[test]
fn number_formatting() {
    assert_eq!(format_number(2.0), "2");
    assert_eq!(format_number(-0.0), "0");
    assert_eq!(format_number(0.5), "0.5");
    assert_eq!(format_number(f64::NAN), "NaN");
    assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
}

#[test]
fn equality_rules() {
    assert!(Value::Null.loose_equals(&Value::Undefined));
    assert!(!Value::Null.strict_equals(&Value::Undefined));
    assert!(Value::string("1").loose_equals(&Value::Number(1.0)));
    assert!(Value::Bool(true).loose_equals(&Value::Number(1.0)));
    assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    assert!(Value::string("a").strict_equals(&Value::string("a")));
}

#[test]
fn int32_wraps() {
    assert_eq!(to_int32(4_294_967_297.0), 1);
    assert_eq!(to_int32(-1.0), -1);
    assert_eq!(to_int32(f64::NAN), 0);
    assert_eq!(Value::Number(3.9).to_i32(), 3);
}

#[test]
fn legacy_bool_is_numeric_before_v5() {
    assert!(matches!(Value::legacy_bool(true, 4), Value::Number(n) if n == 1.0));
    assert!(matches!(Value::legacy_bool(false, 6), Value::Bool(false)));
}
