//! Device memory selection and allocation.
//!
//! Every buffer and image in the RHI allocates its own `vk::DeviceMemory`
//! block. The memory type is chosen by intersecting the resource's
//! requirements bitmask with the caller's property flags, exactly as the
//! device advertises them.

use ash::vk;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Finds the index of a memory type satisfying both the resource's type
/// filter and the requested property flags.
///
/// `type_bits` comes from `vk::MemoryRequirements::memory_type_bits`; bit `i`
/// set means memory type `i` is usable for the resource.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableMemoryType`] when no advertised type
/// matches, which indicates an unsupported device.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> RhiResult<u32> {
    for i in 0..memory_properties.memory_type_count {
        let type_allowed = type_bits & (1 << i) != 0;
        let flags = memory_properties.memory_types[i as usize].property_flags;
        if type_allowed && flags.contains(required) {
            return Ok(i);
        }
    }

    Err(RhiError::NoSuitableMemoryType {
        type_bits,
        flags: required,
    })
}

/// Allocates a dedicated memory block for the given requirements.
///
/// The caller owns the returned handle and must free it (the RAII wrappers
/// in [`crate::buffer`] and [`crate::image`] do this on drop).
pub fn allocate(
    device: &Device,
    requirements: vk::MemoryRequirements,
    flags: vk::MemoryPropertyFlags,
) -> RhiResult<vk::DeviceMemory> {
    let memory_type_index =
        find_memory_type(device.memory_properties(), requirements.memory_type_bits, flags)?;

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    let memory = unsafe { device.handle().allocate_memory(&alloc_info, None)? };
    Ok(memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_properties() -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = 3;
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        props.memory_types[2].property_flags =
            vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE;
        props
    }

    #[test]
    fn test_finds_type_matching_filter_and_flags() {
        let props = synthetic_properties();
        let index = find_memory_type(
            &props,
            0b111,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_first_matching_type_wins() {
        let props = synthetic_properties();
        let index =
            find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_type_filter_excludes_matching_flags() {
        let props = synthetic_properties();
        // Only type 2 is allowed by the filter, so type 0 must be skipped
        // even though its flags match.
        let index =
            find_memory_type(&props, 0b100, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn test_no_match_is_an_error() {
        let props = synthetic_properties();
        let result = find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::LAZILY_ALLOCATED);
        assert!(matches!(
            result,
            Err(RhiError::NoSuitableMemoryType { type_bits: 0b111, .. })
        ));
    }

    #[test]
    fn test_types_beyond_count_are_ignored() {
        let props = synthetic_properties();
        // Bit 3 points past memory_type_count; nothing should match.
        let result = find_memory_type(&props, 0b1000, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert!(result.is_err());
    }
}
