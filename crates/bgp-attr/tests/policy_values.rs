use std::str::FromStr;

use bgp_attr::*;

#[test]
fn test_policy_statement_values() {
    // Values as they appear in a route-map "set" statement.
    let com = Community::from_str("65001:100 no-export").unwrap();
    assert_eq!(com.0.len(), 2);
    assert_eq!(com.0[1], CommunityValue::NO_EXPORT);

    let ext = ExtCommunityValue::from_str("rt:65001:10").unwrap();
    assert_eq!(ext.value_str(), "65001:10");

    let large = LargeCommunityValue::from_str("65001:1:2").unwrap();
    assert_eq!(large.local2, 2);

    let asn = Asn::from_str("65001").unwrap();
    assert_eq!(asn.0, 65001);
}

#[test]
fn test_error_display() {
    let err = CommunityValue::from_str("bogus").unwrap_err();
    assert_eq!(err.to_string(), "invalid community value: bogus");

    let err = Asn::from_str("x").unwrap_err();
    assert_eq!(err, AttrParseError::Asn("x".to_string()));
}
