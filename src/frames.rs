//! The fixed coordinate-frame table and the bitmask that tracks which
//! frames a given value is known to be expressed in.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Number of distinct coordinate frames.
pub const NUM_FRAMES: usize = 23;

/// `GLOBAL`/`LOCAL` are bare aliases for `MAV_FRAME_GLOBAL`/
/// `MAV_FRAME_LOCAL_NED` kept for source compatibility with older
/// message-definition files that predate the `MAV_FRAME_*` naming.
fn frame_table() -> &'static HashMap<&'static str, u32> {
    static TABLE: OnceLock<HashMap<&'static str, u32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("GLOBAL", 0),
            ("LOCAL", 1),
            ("MAV_FRAME_GLOBAL", 0),
            ("MAV_FRAME_LOCAL_NED", 1),
            ("MAV_FRAME_MISSION", 2),
            ("MAV_FRAME_GLOBAL_RELATIVE_ALT", 3),
            ("MAV_FRAME_LOCAL_ENU", 4),
            ("MAV_FRAME_GLOBAL_INT", 5),
            ("MAV_FRAME_GLOBAL_RELATIVE_ALT_INT", 6),
            ("MAV_FRAME_LOCAL_OFFSET_NED", 7),
            ("MAV_FRAME_BODY_NED", 8),
            ("MAV_FRAME_BODY_OFFSET_NED", 9),
            ("MAV_FRAME_GLOBAL_TERRAIN_ALT", 10),
            ("MAV_FRAME_GLOBAL_TERRAIN_ALT_INT", 11),
            ("MAV_FRAME_BODY_FRD", 12),
            ("MAV_FRAME_LOCAL_FRD", 20),
            ("MAV_FRAME_LOCAL_FLU", 21),
            ("UNIX", 22),
        ])
    })
}

/// Look up a frame's bit index by name, e.g. `"MAV_FRAME_BODY_FRD"` → `12`.
pub fn frame_id(name: &str) -> Option<u32> {
    frame_table().get(name).copied()
}

/// A bitmask over [`NUM_FRAMES`] coordinate frames: bit `i` set means the
/// value is known to be (possibly among others) expressed in the frame
/// whose id is `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Frames(u32);

impl Frames {
    /// The empty mask: no frame information at all.
    pub const NONE: Frames = Frames(0);

    /// A mask with exactly one bit set.
    pub fn single(id: u32) -> Self {
        debug_assert!((id as usize) < NUM_FRAMES);
        Frames(1 << id)
    }

    /// A mask built from an arbitrary set of frame ids, e.g. as loaded from
    /// a prior-types description's `CoordinateFrames` list.
    pub fn from_ids(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut mask = 0u32;
        for id in ids {
            debug_assert!((id as usize) < NUM_FRAMES);
            mask |= 1 << id;
        }
        Frames(mask)
    }

    /// True if the two masks share at least one frame, i.e. neither is a
    /// positive assertion of mutual exclusion.
    pub fn compatible(self, other: Frames) -> bool {
        self.0 == 0 || other.0 == 0 || (self.0 & other.0) != 0
    }

    /// True if bit `id` is set.
    pub fn contains(self, id: u32) -> bool {
        (self.0 & (1 << id)) != 0
    }

    /// Every frame *not* in this mask, restricted to the known universe of
    /// [`NUM_FRAMES`] frames. Used when an `if (msg.frame == X)` guard lets
    /// the walker narrow the `else` branch to "anything but X".
    pub fn invert(self) -> Frames {
        let universe = (1u32 << NUM_FRAMES) - 1;
        Frames(!self.0 & universe)
    }

    /// Raw bits, for handing to the Z3 encoding in [`crate::algebra`].
    pub fn bits(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_and_local_aliases_agree() {
        assert_eq!(frame_id("GLOBAL"), frame_id("MAV_FRAME_GLOBAL"));
        assert_eq!(frame_id("LOCAL"), frame_id("MAV_FRAME_LOCAL_NED"));
    }

    #[test]
    fn table_ids_fit_within_num_frames_and_reach_the_top_bit() {
        // The table has gaps (ids 13-19 are unnamed, matching the original's
        // own MAV_FRAME_TO_ID) so this checks the bound, not an exact count.
        let mut ids: Vec<u32> = frame_table().values().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        assert!(ids.iter().all(|&id| (id as usize) < NUM_FRAMES));
        assert_eq!(*ids.last().unwrap(), (NUM_FRAMES - 1) as u32);
    }

    #[test]
    fn invert_excludes_original_bits() {
        let f = Frames::single(8);
        let inv = f.invert();
        assert!(!inv.contains(8));
        assert!(inv.contains(0));
        assert!(f.compatible(Frames::NONE));
        assert!(!f.compatible(inv));
    }

    #[test]
    fn empty_mask_is_compatible_with_anything() {
        assert!(Frames::NONE.compatible(Frames::single(3)));
    }
}
