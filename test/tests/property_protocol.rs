/// PROPERTY-BASED TESTS: protocol invariants
///
/// Uses proptest to verify that the serde primitives and schema hashing
/// hold up across random inputs.
///
/// Key invariants:
/// 1. Schema hashes are independent of registration order
/// 2. Quantization round-trips within half a quantum
/// 3. Packed integers and ids survive a ser/de round trip
/// 4. Wrapping tick arithmetic agrees with sequence comparison

use proptest::prelude::*;
use wraith_shared::{
    dequantize, quantize, sequence_greater_than, wrapping_diff, BitReader, BitWriter, GhostId,
    Serde, SignedVariableInteger, UnsignedVariableInteger,
};
use wraith_test::test_protocol::protocol;

proptest! {
    /// Any permutation of the same ghost types hashes the same.
    #[test]
    fn prop_component_hash_ignores_registration_order(order in Just(vec![0usize, 1, 2]).prop_shuffle()) {
        use wraith_shared::{FieldDescriptor, GhostType, ScalarKind, SchemaRegistry};

        fn make_type(index: usize) -> GhostType {
            match index {
                0 => GhostType::builder("Alpha")
                    .field(FieldDescriptor::scalar("a", ScalarKind::Int))
                    .build(),
                1 => GhostType::builder("Beta")
                    .field(FieldDescriptor::scalar("b", ScalarKind::Float).with_quantize(10.0))
                    .build(),
                _ => GhostType::builder("Gamma")
                    .field(FieldDescriptor::list("c", ScalarKind::Int, 4))
                    .build(),
            }
        }

        let mut ordered = SchemaRegistry::builder(1, 1);
        for index in 0..3 {
            ordered.add_ghost_type(make_type(index)).unwrap();
        }
        let mut shuffled = SchemaRegistry::builder(1, 1);
        for index in order {
            shuffled.add_ghost_type(make_type(index)).unwrap();
        }
        prop_assert_eq!(
            ordered.build().component_hash(),
            shuffled.build().component_hash()
        );
    }

    /// Quantized floats come back within half a quantum of the original.
    #[test]
    fn prop_quantization_bounded_error(
        value in -1000.0f32..1000.0f32,
        q in prop_oneof![Just(10.0f32), Just(100.0f32)],
    ) {
        let raw = quantize(value, q);
        let restored = dequantize(raw, q);
        prop_assert!((restored - value).abs() <= 0.5 / q + 1e-3);
    }

    /// Variable-length unsigned integers round trip at any magnitude.
    #[test]
    fn prop_unsigned_variable_integer_round_trip(value in 0u64..=u32::MAX as u64) {
        let mut writer = BitWriter::new();
        UnsignedVariableInteger::<7>::new(value).ser(&mut writer);
        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        let read = UnsignedVariableInteger::<7>::de(&mut reader).unwrap();
        prop_assert_eq!(read.get(), value as i128);
    }

    /// Signed variable integers round trip across the sign boundary.
    #[test]
    fn prop_signed_variable_integer_round_trip(value in -100_000i64..100_000i64) {
        let mut writer = BitWriter::new();
        SignedVariableInteger::<10>::new(value).ser(&mut writer);
        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        let read = SignedVariableInteger::<10>::de(&mut reader).unwrap();
        prop_assert_eq!(read.get(), value as i128);
    }

    /// Ghost ids survive the wire.
    #[test]
    fn prop_ghost_id_round_trip(value in 0u16..u16::MAX) {
        let id = GhostId::new(value);
        let mut writer = BitWriter::new();
        id.ser(&mut writer);
        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        prop_assert_eq!(GhostId::de(&mut reader).unwrap(), id);
    }

    /// Advancing a tick by up to half the sequence space always compares
    /// as newer, and the wrapping distance matches the advance.
    #[test]
    fn prop_wrapping_tick_ordering(start in any::<u16>(), advance in 1u16..=32767) {
        let later = start.wrapping_add(advance);
        prop_assert!(sequence_greater_than(later, start));
        prop_assert!(!sequence_greater_than(start, later));
        prop_assert_eq!(wrapping_diff(start, later), advance as i16);
    }
}

/// The canonical and reordered test protocols are exercised all over the
/// e2e suite; pin their hash equality here too so a schema edit that
/// breaks it fails fast.
#[test]
fn canonical_protocol_hashes_are_stable_across_order() {
    assert_eq!(
        protocol().component_hash(),
        wraith_test::test_protocol::protocol_reordered().component_hash()
    );
    assert_eq!(
        protocol().rpc_hash(),
        wraith_test::test_protocol::protocol_reordered().rpc_hash()
    );
}
