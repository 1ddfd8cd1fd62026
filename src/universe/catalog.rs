//! Static catalog of the universes every batch renders

use crate::orchestration::task::TaskId;

/// One universe: a stable key plus the text used to describe its style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Universe {
    /// Stable identifier, used as the task id
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    /// Visual style description fed into the prompt
    pub description: &'static str,
}

impl Universe {
    /// Task id for this universe
    pub fn task_id(&self) -> TaskId {
        TaskId::new(self.key)
    }
}

/// Every universe in album order
pub const UNIVERSES: [Universe; 6] = [
    Universe {
        key: "cyberpunk",
        name: "Cyberpunk",
        description: "neon-drenched streets, rain-slick chrome, holographic signage \
                      and a magenta and teal night palette",
    },
    Universe {
        key: "medieval",
        name: "Medieval",
        description: "stone castles, candlelit halls, heraldic banners and the \
                      warm earthy tones of an illuminated manuscript",
    },
    Universe {
        key: "post_apocalyptic",
        name: "Post-Apocalyptic",
        description: "overgrown ruins, rusted machinery, dust-filled air and a \
                      bleached amber wasteland palette",
    },
    Universe {
        key: "futuristic",
        name: "Futuristic",
        description: "clean white architecture, soft ambient lighting, sleek \
                      spacecraft and a cool silver-blue palette",
    },
    Universe {
        key: "fantasy",
        name: "Fantasy",
        description: "enchanted forests, floating islands, glowing runes and a \
                      lush saturated palette of emerald and gold",
    },
    Universe {
        key: "underwater",
        name: "Underwater",
        description: "sunbeams through deep water, coral reefs, drifting bubbles \
                      and a dense aquamarine palette",
    },
];

/// Look up a universe by key
pub fn find(key: &str) -> Option<&'static Universe> {
    UNIVERSES.iter().find(|universe| universe.key == key)
}

/// Task ids of every universe in album order
pub fn task_ids() -> Vec<TaskId> {
    UNIVERSES.iter().map(Universe::task_id).collect()
}
