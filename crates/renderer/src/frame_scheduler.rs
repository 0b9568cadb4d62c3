//! Frame pacing and swapchain-image ownership tracking.
//!
//! This module owns the two pieces of bookkeeping that keep overlapping
//! frames from trampling each other:
//!
//! - A ring of [`FrameSlot`]s. The CPU records frame N+1 while the GPU still
//!   renders frame N; each slot's fence gates reuse of that slot's
//!   semaphores and its turn in the ring.
//! - An [`ImageOwnerTable`] mapping each swapchain image to the fence of the
//!   slot currently rendering into it. Acquire order is not ring order: with
//!   more images than slots the presentation engine may hand back an image
//!   an older slot is still writing, and the table is what catches that.
//!
//! The per-tick protocol lives in the renderer; the scheduler exposes one
//! method per synchronization step so the tick reads as the protocol.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use meshview_rhi::RhiResult;
use meshview_rhi::device::Device;
use meshview_rhi::sync::{FrameSlot, MAX_FRAMES_IN_FLIGHT};

/// Advances a slot index one step around the ring.
fn next_slot(current: usize, slot_count: usize) -> usize {
    (current + 1) % slot_count
}

/// Tracks which frame slot's fence owns each swapchain image.
///
/// At most one owner exists per image at any instant. Claiming an image
/// hands back the previous owner (if any) exactly once, so the caller can
/// wait on it before reusing the image. The table is reset whenever the
/// swapchain is rebuilt, since old fences no longer guard the new images.
#[derive(Debug, Default)]
pub struct ImageOwnerTable {
    owners: Vec<Option<vk::Fence>>,
}

impl ImageOwnerTable {
    /// Creates a table for `image_count` swapchain images, all unowned.
    pub fn new(image_count: usize) -> Self {
        Self {
            owners: vec![None; image_count],
        }
    }

    /// Records `fence` as the owner of `image_index`.
    ///
    /// Returns the fence that owned the image before, which must be waited
    /// on before the image is rendered to again. Returns `None` when the
    /// image had no in-flight owner.
    pub fn claim(&mut self, image_index: usize, fence: vk::Fence) -> Option<vk::Fence> {
        self.owners[image_index].replace(fence)
    }

    /// Returns the current owner of `image_index`, if any.
    pub fn owner(&self, image_index: usize) -> Option<vk::Fence> {
        self.owners[image_index]
    }

    /// Drops all owners and resizes the table for a rebuilt swapchain.
    pub fn reset(&mut self, image_count: usize) {
        self.owners.clear();
        self.owners.resize(image_count, None);
    }

    /// Returns the number of tracked images.
    pub fn image_count(&self) -> usize {
        self.owners.len()
    }
}

/// Owns the frame-slot ring and the image ownership table.
///
/// The scheduler is not thread-safe; it belongs to the render thread.
pub struct FrameScheduler {
    /// Reference to the logical device, for raw fence waits on previous
    /// image owners.
    device: Arc<Device>,
    /// The slot ring, length [`MAX_FRAMES_IN_FLIGHT`].
    slots: Vec<FrameSlot>,
    /// Fence-per-image ownership table.
    image_owners: ImageOwnerTable,
    /// Index of the slot serving the current tick.
    current_slot: usize,
}

impl FrameScheduler {
    /// Creates the slot ring and an empty ownership table for
    /// `image_count` swapchain images.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore or fence creation fails.
    pub fn new(device: Arc<Device>, image_count: usize) -> RhiResult<Self> {
        let mut slots = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            slots.push(FrameSlot::new(device.clone())?);
        }

        info!(
            "Frame scheduler created: {} slots, {} swapchain images",
            slots.len(),
            image_count
        );

        Ok(Self {
            device,
            slots,
            image_owners: ImageOwnerTable::new(image_count),
            current_slot: 0,
        })
    }

    /// Returns the slot serving the current tick.
    #[inline]
    pub fn current_slot(&self) -> &FrameSlot {
        &self.slots[self.current_slot]
    }

    /// Returns the current slot index.
    #[inline]
    pub fn slot_index(&self) -> usize {
        self.current_slot
    }

    /// Blocks until the current slot's previous submission has retired.
    ///
    /// The first use of each slot returns immediately because its fence is
    /// created signaled.
    ///
    /// # Errors
    ///
    /// Returns an error if the fence wait fails.
    pub fn wait_for_current_slot(&self) -> RhiResult<()> {
        self.slots[self.current_slot]
            .in_flight_fence()
            .wait(u64::MAX)?;
        Ok(())
    }

    /// Takes ownership of an acquired swapchain image for the current slot.
    ///
    /// If another slot is still rendering into this image, blocks on that
    /// slot's fence first. Afterwards the current slot's fence is the
    /// recorded owner of the image.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting on the previous owner fails.
    pub fn claim_image(&mut self, image_index: u32) -> RhiResult<()> {
        let fence = self.slots[self.current_slot].in_flight_fence_handle();

        if let Some(previous_owner) = self.image_owners.claim(image_index as usize, fence) {
            unsafe {
                self.device
                    .handle()
                    .wait_for_fences(&[previous_owner], true, u64::MAX)?;
            }
        }

        Ok(())
    }

    /// Resets the current slot's fence to unsignaled.
    ///
    /// Call this only once a submission is certain to follow; a reset fence
    /// with no pending submission deadlocks the next wait on this slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the fence reset fails.
    pub fn reset_current_fence(&self) -> RhiResult<()> {
        self.slots[self.current_slot].in_flight_fence().reset()
    }

    /// Advances to the next slot in the ring.
    pub fn advance(&mut self) {
        self.current_slot = next_slot(self.current_slot, self.slots.len());
    }

    /// Clears the ownership table for a rebuilt swapchain.
    ///
    /// The caller must have idled the device first; after the reset no
    /// stale fence guards the new images.
    pub fn reset_image_owners(&mut self, image_count: usize) {
        self.image_owners.reset(image_count);
        debug!("Image ownership table reset for {} images", image_count);
    }

    /// Returns the number of slots in the ring.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn fence(raw: u64) -> vk::Fence {
        vk::Fence::from_raw(raw)
    }

    #[test]
    fn test_new_table_has_no_owners() {
        let table = ImageOwnerTable::new(3);
        assert_eq!(table.image_count(), 3);
        for i in 0..3 {
            assert_eq!(table.owner(i), None);
        }
    }

    #[test]
    fn test_first_claim_returns_no_previous_owner() {
        let mut table = ImageOwnerTable::new(3);
        assert_eq!(table.claim(1, fence(0xA)), None);
        assert_eq!(table.owner(1), Some(fence(0xA)));
    }

    #[test]
    fn test_claim_returns_previous_owner_exactly_once() {
        let mut table = ImageOwnerTable::new(3);
        table.claim(0, fence(0xA));

        // The second claim surfaces the first owner so the caller can wait
        // on it; afterwards only the new owner is recorded.
        assert_eq!(table.claim(0, fence(0xB)), Some(fence(0xA)));
        assert_eq!(table.owner(0), Some(fence(0xB)));
        assert_eq!(table.claim(0, fence(0xC)), Some(fence(0xB)));
    }

    #[test]
    fn test_images_have_independent_owners() {
        let mut table = ImageOwnerTable::new(2);
        table.claim(0, fence(0xA));

        assert_eq!(table.owner(0), Some(fence(0xA)));
        assert_eq!(table.owner(1), None);

        table.claim(1, fence(0xB));
        assert_eq!(table.owner(0), Some(fence(0xA)));
        assert_eq!(table.owner(1), Some(fence(0xB)));
    }

    #[test]
    fn test_reset_drops_all_owners() {
        let mut table = ImageOwnerTable::new(2);
        table.claim(0, fence(0xA));
        table.claim(1, fence(0xB));

        table.reset(4);

        assert_eq!(table.image_count(), 4);
        for i in 0..4 {
            assert_eq!(table.owner(i), None);
        }
    }

    #[test]
    fn test_slot_ring_wraps() {
        // Two slots: 0 -> 1 -> 0.
        assert_eq!(next_slot(0, MAX_FRAMES_IN_FLIGHT), 1);
        assert_eq!(next_slot(1, MAX_FRAMES_IN_FLIGHT), 0);
    }

    #[test]
    fn test_scheduler_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FrameScheduler>();
        assert_send::<ImageOwnerTable>();
    }
}
