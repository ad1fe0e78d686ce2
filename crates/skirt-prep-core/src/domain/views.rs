use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewDirection {
    pub index: usize,
    pub theta_deg: f64,
    pub phi_deg: f64,
    pub dir: [f64; 3],
}

impl ViewDirection {
    /// Instrument name shared by the configuration document and the simulator's output files.
    pub fn instrument_name(&self) -> String {
        instrument_name_for_index(self.index)
    }
}

pub(crate) fn instrument_name_for_index(index: usize) -> String {
    format!("view_{index:03}")
}

/// Ordered view directions; `views[i].index == i` for generated sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSet {
    pub num_views: usize,
    pub method: String,
    pub views: Vec<ViewDirection>,
}

impl ViewSet {
    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewDirection> {
        self.views.iter()
    }

    pub fn instrument_names(&self) -> Vec<String> {
        self.views.iter().map(ViewDirection::instrument_name).collect()
    }
}
