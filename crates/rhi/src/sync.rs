//! Synchronization primitives for Vulkan.
//!
//! This module provides wrappers for Vulkan synchronization objects:
//! - [`Semaphore`] - GPU-to-GPU synchronization (between queue operations)
//! - [`Fence`] - GPU-to-CPU synchronization (for host waiting)
//! - [`FrameSlot`] - The per-slot objects of the frames-in-flight ring
//!
//! # Overview
//!
//! Rendering runs on a ring of [`MAX_FRAMES_IN_FLIGHT`] slots. Each slot
//! owns the objects that tie one in-flight frame together:
//!
//! ```text
//! 1. Wait on the slot's in-flight fence (previous use of this slot done)
//! 2. Acquire a swapchain image, signaling the image-available semaphore
//! 3. Reset the fence
//! 4. Submit: wait image-available, signal render-finished, fence on completion
//! 5. Present: wait render-finished
//! ```
//!
//! The fence starts signaled so the first pass through a slot does not
//! block forever.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiError;

/// Vulkan semaphore wrapper.
///
/// Used for GPU-to-GPU synchronization between queue operations: waiting
/// for image acquisition before rendering, and for rendering before
/// presentation.
///
/// # Thread Safety
///
/// The semaphore is immutable after creation and can be safely shared
/// between threads.
pub struct Semaphore {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan semaphore handle.
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates a new semaphore in the unsignaled state.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>) -> Result<Self, RhiError> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        Ok(Self { device, semaphore })
    }

    /// Returns the Vulkan semaphore handle.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Vulkan fence wrapper.
///
/// Used for GPU-to-CPU synchronization: the host waits on a fence to know
/// when submitted work has completed.
pub struct Fence {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan fence handle.
    fence: vk::Fence,
}

impl Fence {
    /// Creates a new fence.
    ///
    /// Pass `signaled: true` for fences that are waited on before the
    /// first submission that would signal them.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<Device>, signaled: bool) -> Result<Self, RhiError> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        Ok(Self { device, fence })
    }

    /// Returns the Vulkan fence handle.
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Waits for the fence to become signaled.
    ///
    /// Blocks until the fence is signaled or the timeout (in nanoseconds)
    /// expires. Use `u64::MAX` for an unbounded wait.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout or device loss.
    pub fn wait(&self, timeout: u64) -> Result<(), RhiError> {
        let fences = [self.fence];
        unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, timeout)?
        };
        Ok(())
    }

    /// Resets the fence to the unsignaled state.
    ///
    /// The fence must not be in use by any queue operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset operation fails.
    pub fn reset(&self) -> Result<(), RhiError> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences)? };
        Ok(())
    }

    /// Checks if the fence is currently signaled (non-blocking).
    pub fn is_signaled(&self) -> bool {
        let result = unsafe { self.device.handle().get_fence_status(self.fence) };
        matches!(result, Ok(true))
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

/// Maximum number of frames the CPU may record ahead of the GPU.
///
/// With 2 slots the CPU prepares the next frame while the GPU renders the
/// current one; more slots add latency without improving throughput here.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// One slot of the frames-in-flight ring.
///
/// Groups the synchronization objects that accompany a single in-flight
/// frame:
/// - image-available semaphore: signaled when the acquired image is ready
/// - render-finished semaphore: signaled when rendering to it completes
/// - in-flight fence: signaled when the slot's submission has fully executed
///
/// Slots are independent of the swapchain and survive its recreation.
pub struct FrameSlot {
    /// Semaphore signaled when a swapchain image is available.
    image_available: Semaphore,
    /// Semaphore signaled when rendering is complete.
    render_finished: Semaphore,
    /// Fence signaled when the slot's submission has executed.
    in_flight: Fence,
}

impl FrameSlot {
    /// Creates the synchronization objects for one frame slot.
    ///
    /// The in-flight fence starts signaled so the first wait on this slot
    /// returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if any object creation fails.
    pub fn new(device: Arc<Device>) -> Result<Self, RhiError> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        debug!("Created frame slot synchronization objects");

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Returns the in-flight fence for waiting and resetting.
    #[inline]
    pub fn in_flight_fence(&self) -> &Fence {
        &self.in_flight
    }

    /// Returns the raw handle of the image-available semaphore.
    #[inline]
    pub fn image_available_handle(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    /// Returns the raw handle of the render-finished semaphore.
    #[inline]
    pub fn render_finished_handle(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    /// Returns the raw handle of the in-flight fence.
    #[inline]
    pub fn in_flight_fence_handle(&self) -> vk::Fence {
        self.in_flight.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_frames_in_flight_constant() {
        // The image-owner bookkeeping assumes at least double buffering
        assert!(MAX_FRAMES_IN_FLIGHT >= 2);
        assert!(MAX_FRAMES_IN_FLIGHT <= 4);
    }

    #[test]
    fn test_semaphore_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
    }

    #[test]
    fn test_fence_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Fence>();
    }

    #[test]
    fn test_frame_slot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameSlot>();
    }
}
