//! GPU buffer management.
//!
//! This module handles vertex, index, uniform, and staging buffers. Each
//! buffer owns a dedicated `vk::DeviceMemory` block chosen through
//! [`crate::memory`]; geometry lives in device-local memory filled through a
//! staging buffer, while uniform buffers stay host-visible and persistently
//! mapped so the frame loop can write them directly.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::command::{CommandPool, one_time_submit};
use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::memory;

/// Buffer usage type.
///
/// Defines the intended use of the buffer, which determines both the Vulkan
/// usage flags and the memory properties requested for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer - device local, filled once through staging
    Vertex,
    /// Index buffer - device local, filled once through staging
    Index,
    /// Uniform buffer - host visible, rewritten every frame
    Uniform,
    /// Staging buffer - host visible transfer source
    Staging,
}

impl BufferUsage {
    /// Converts to Vulkan buffer usage flags.
    pub fn to_vk_usage(self) -> vk::BufferUsageFlags {
        match self {
            BufferUsage::Vertex => {
                vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Index => {
                vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
            }
            BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
            BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
        }
    }

    /// Returns the memory property flags requested for this buffer type.
    pub fn memory_flags(self) -> vk::MemoryPropertyFlags {
        match self {
            BufferUsage::Vertex | BufferUsage::Index => vk::MemoryPropertyFlags::DEVICE_LOCAL,
            BufferUsage::Uniform | BufferUsage::Staging => {
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
            }
        }
    }

    /// True if buffers of this type are mapped for CPU writes.
    pub fn is_host_visible(self) -> bool {
        self.memory_flags()
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
    }

    /// Returns a human-readable name for the buffer type.
    pub fn name(self) -> &'static str {
        match self {
            BufferUsage::Vertex => "vertex",
            BufferUsage::Index => "index",
            BufferUsage::Uniform => "uniform",
            BufferUsage::Staging => "staging",
        }
    }
}

/// GPU buffer wrapper owning its memory block.
///
/// Host-visible buffers are mapped for their whole lifetime; the pointer is
/// released in `Drop` just before the memory is freed.
///
/// # Thread Safety
///
/// The buffer itself is not thread-safe. Synchronize access externally
/// when sharing between threads.
pub struct Buffer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan buffer handle.
    buffer: vk::Buffer,
    /// Backing memory block.
    memory: vk::DeviceMemory,
    /// Persistent mapping for host-visible buffers.
    mapped: Option<*mut std::ffi::c_void>,
    /// Buffer size in bytes.
    size: vk::DeviceSize,
    /// Buffer usage type.
    usage: BufferUsage,
}

impl Buffer {
    /// Creates a new buffer with the specified size.
    ///
    /// Host-visible usages are mapped immediately and stay mapped.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation or memory allocation fails.
    pub fn new(device: Arc<Device>, usage: BufferUsage, size: vk::DeviceSize) -> RhiResult<Self> {
        if size == 0 {
            return Err(RhiError::ResourceCreationFailed(format!(
                "{} buffer size must be greater than 0",
                usage.name()
            )));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage.to_vk_usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };

        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let memory = match memory::allocate(&device, requirements, usage.memory_flags()) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.handle().destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        unsafe {
            device.handle().bind_buffer_memory(buffer, memory, 0)?;
        }

        let mapped = if usage.is_host_visible() {
            let ptr = unsafe {
                device
                    .handle()
                    .map_memory(memory, 0, size, vk::MemoryMapFlags::empty())?
            };
            Some(ptr)
        } else {
            None
        };

        debug!("Created {} buffer: {} bytes", usage.name(), size);

        Ok(Self {
            device,
            buffer,
            memory,
            mapped,
            size,
            usage,
        })
    }

    /// Creates a device-local buffer and fills it through a staging buffer.
    ///
    /// The staging buffer lives only for the duration of the upload; the copy
    /// runs as a one-shot submission on `upload_pool` and this function
    /// returns once the transfer has completed.
    ///
    /// # Errors
    ///
    /// Returns an error if creation, allocation, or the transfer fails.
    pub fn device_local_with_data(
        device: Arc<Device>,
        usage: BufferUsage,
        data: &[u8],
        upload_pool: &CommandPool,
    ) -> RhiResult<Self> {
        let size = data.len() as vk::DeviceSize;

        let staging = Self::new(device.clone(), BufferUsage::Staging, size)?;
        staging.write(0, data)?;

        let buffer = Self::new(device.clone(), usage, size)?;

        one_time_submit(&device, upload_pool, |vk_device, cmd| {
            let region = vk::BufferCopy::default().size(size);
            unsafe {
                vk_device.cmd_copy_buffer(cmd, staging.handle(), buffer.handle(), &[region]);
            }
        })?;

        Ok(buffer)
    }

    /// Writes data to the buffer at the specified offset.
    ///
    /// The buffer must be host visible (uniform or staging usage).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The buffer memory is not mapped
    /// - The write would exceed the buffer size
    pub fn write(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(RhiError::InvalidOperation(format!(
                "Write exceeds buffer size: offset {} + data {} > buffer {}",
                offset,
                data.len(),
                self.size
            )));
        }

        let mapped = self.mapped.ok_or_else(|| {
            RhiError::InvalidOperation(format!(
                "{} buffer is not host visible, cannot write from the CPU",
                self.usage.name()
            ))
        })?;

        unsafe {
            let dst = (mapped as *mut u8).add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }

        Ok(())
    }

    /// Returns the Vulkan buffer handle.
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Returns the buffer size in bytes.
    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Returns the buffer usage type.
    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.take().is_some() {
                self.device.handle().unmap_memory(self.memory);
            }
            self.device.handle().destroy_buffer(self.buffer, None);
            self.device.handle().free_memory(self.memory, None);
        }

        debug!("Destroyed {} buffer", self.usage.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_to_vk_usage() {
        assert!(
            BufferUsage::Vertex
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert!(
            BufferUsage::Index
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert!(
            BufferUsage::Uniform
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::UNIFORM_BUFFER)
        );
        assert!(
            BufferUsage::Staging
                .to_vk_usage()
                .contains(vk::BufferUsageFlags::TRANSFER_SRC)
        );
    }

    #[test]
    fn test_geometry_buffers_are_device_local() {
        assert_eq!(
            BufferUsage::Vertex.memory_flags(),
            vk::MemoryPropertyFlags::DEVICE_LOCAL
        );
        assert_eq!(
            BufferUsage::Index.memory_flags(),
            vk::MemoryPropertyFlags::DEVICE_LOCAL
        );
        assert!(!BufferUsage::Vertex.is_host_visible());
    }

    #[test]
    fn test_cpu_written_buffers_are_host_coherent() {
        let expected =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(BufferUsage::Uniform.memory_flags(), expected);
        assert_eq!(BufferUsage::Staging.memory_flags(), expected);
        assert!(BufferUsage::Uniform.is_host_visible());
    }

    #[test]
    fn test_buffer_usage_name() {
        assert_eq!(BufferUsage::Vertex.name(), "vertex");
        assert_eq!(BufferUsage::Index.name(), "index");
        assert_eq!(BufferUsage::Uniform.name(), "uniform");
        assert_eq!(BufferUsage::Staging.name(), "staging");
    }
}
