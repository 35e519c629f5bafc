use proptest::prelude::*;

use crate::address::{AccessWidth, AddressLayout};
use crate::config::ReplacementPolicyConfig;
use crate::hierarchy::Hierarchy;
use super::two_level;

fn policy() -> impl Strategy<Value = ReplacementPolicyConfig> {
    prop_oneof![
        Just(ReplacementPolicyConfig::LeastRecentlyUsed),
        Just(ReplacementPolicyConfig::MostRecentlyUsed),
        Just(ReplacementPolicyConfig::LeastFrequentlyUsed),
        Just(ReplacementPolicyConfig::Random),
        Just(ReplacementPolicyConfig::Constant),
    ]
}

fn width() -> impl Strategy<Value = AccessWidth> {
    prop_oneof![Just(AccessWidth::Byte), Just(AccessWidth::Half), Just(AccessWidth::Word)]
}

/// (is write, address, value) over the 1 KiB store of the two level hierarchy
fn byte_trace() -> impl Strategy<Value = Vec<(bool, u64, u8)>> {
    prop::collection::vec((any::<bool>(), 0u64..1024, any::<u8>()), 1..400)
}

proptest! {
    #[test]
    fn tag_and_offset_rebuild_the_address(
        address in any::<u64>(),
        width in width(),
        line_bits in 2u32..9,
        set_bits in 0u32..7,
    ) {
        let line_size = 1u64 << line_bits;
        let layout = AddressLayout::new(width, line_size, ((1u64 << set_bits) - 1) << line_bits);
        let parts = layout.split(address);
        prop_assert_eq!(layout.join(parts), address);
        prop_assert_eq!(parts.tag & layout.offset_mask(), 0);
        prop_assert_eq!(parts.tag & layout.tag_mask(), parts.tag);
        prop_assert!(parts.offset < width.elements_per_line(line_size));
        prop_assert!(parts.set < 1 << set_bits);
        prop_assert_eq!(layout.line_byte_address(address) % line_size, 0);
    }

    #[test]
    fn reads_return_the_last_write(trace in byte_trace(), policy in policy()) {
        let mut h = Hierarchy::new(&two_level(policy)).unwrap();
        let mut shadow = vec![0u8; 1024];
        for (write, address, value) in trace {
            if write {
                h.write_byte(address, value).unwrap();
                shadow[address as usize] = value;
            } else {
                prop_assert_eq!(h.read_byte(address).unwrap(), shadow[address as usize]);
            }
        }
        prop_assert_eq!(h.levels()[1].stats().writebacks, h.memory().writes());
        h.flush().unwrap();
        prop_assert_eq!(h.levels()[1].stats().writebacks, h.memory().writes());
        for line in (0..1024).step_by(16) {
            prop_assert_eq!(h.memory().line(line).unwrap(), &shadow[line as usize..line as usize + 16]);
        }
    }

    #[test]
    fn halfword_reads_return_the_last_write(
        trace in prop::collection::vec((any::<bool>(), 0u64..512, any::<u16>()), 1..300),
        policy in policy(),
    ) {
        let mut h = Hierarchy::new(&two_level(policy).with_width(AccessWidth::Half)).unwrap();
        let mut shadow = vec![0u16; 512];
        for (write, address, value) in trace {
            if write {
                h.write16(address, value).unwrap();
                shadow[address as usize] = value;
            } else {
                prop_assert_eq!(h.read16(address).unwrap(), shadow[address as usize]);
            }
        }
    }

    #[test]
    fn word_reads_return_the_last_write(
        trace in prop::collection::vec((any::<bool>(), 0u64..256, any::<u32>()), 1..300),
        policy in policy(),
    ) {
        let mut h = Hierarchy::new(&two_level(policy).with_width(AccessWidth::Word)).unwrap();
        let mut shadow = vec![0u32; 256];
        for (write, address, value) in trace {
            if write {
                h.write32(address, value).unwrap();
                shadow[address as usize] = value;
            } else {
                prop_assert_eq!(h.read32(address).unwrap(), shadow[address as usize]);
            }
        }
        h.flush().unwrap();
        for (element, &value) in shadow.iter().enumerate() {
            let line = (element as u64 * 4) & !15;
            let offset = element * 4 % 16;
            prop_assert_eq!(&h.memory().line(line).unwrap()[offset..offset + 4], &value.to_be_bytes()[..]);
        }
    }

    #[test]
    fn every_access_is_served_exactly_once(trace in byte_trace(), policy in policy()) {
        let mut h = Hierarchy::new(&two_level(policy).with_fill_as_hit(false)).unwrap();
        for &(write, address, value) in &trace {
            if write {
                h.write_byte(address, value).unwrap();
            } else {
                h.read_byte(address).unwrap();
            }
        }
        prop_assert_eq!(h.service_breakdown().total(), trace.len() as u64);
        prop_assert_eq!(h.levels()[0].stats().accesses(), trace.len() as u64);
    }

    #[test]
    fn replays_are_deterministic(trace in byte_trace(), policy in policy()) {
        let run = || {
            let mut h = Hierarchy::new(&two_level(policy)).unwrap();
            for &(write, address, value) in &trace {
                if write {
                    h.write_byte(address, value).unwrap();
                } else {
                    h.read_byte(address).unwrap();
                }
            }
            (h.level_stats(), h.memory().reads(), h.memory().writes())
        };
        prop_assert_eq!(run(), run());
    }
}
