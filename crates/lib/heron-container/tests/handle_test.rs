use heron_container::{define_handle, define_slim_handle, Handle};

define_handle!(struct Wide, salt = 0x2A);
define_slim_handle!(struct Slim, salt = 0x0B);

#[test]
pub fn test_wide_handle_roundtrip() {
    let h = Wide::assemble(1234, 7);

    assert!(h.is_valid());
    assert_eq!(1234, h.index());
    assert_eq!(7, h.generation());
}

#[test]
pub fn test_slim_handle_roundtrip() {
    let h = Slim::assemble(0xFFFFF, 3);

    assert!(h.is_valid());
    assert_eq!(0xFFFFF, h.index());
    assert_eq!(3, h.generation());
}

#[test]
pub fn test_slim_generation_wraps_at_four_bits() {
    let h = Slim::assemble(1, 0x1F);
    assert_eq!(0xF, h.generation());
}

#[test]
pub fn test_invalid_is_zero_and_salt_checked() {
    assert!(!Wide::INVALID.is_valid());
    assert!(!Slim::INVALID.is_valid());

    // Index zero at generation zero is still a valid handle thanks to the salt bits.
    assert!(Wide::assemble(0, 0).is_valid());

    // A raw value carrying a foreign salt never validates as this kind.
    let foreign = Wide::from_raw(0x55u64 << 56);
    assert!(!foreign.is_valid());
}
