//! Grouping of a job's layers by variable and vertical level.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;
use viewer_common::{LayerDescriptor, ValidTime, ViewerError, ViewerResult};

/// Style shared by every frame of a group.
#[derive(Debug, Clone, PartialEq)]
struct GroupStyle {
    palette: String,
    units: String,
    opacity: f64,
}

impl GroupStyle {
    fn from_descriptor(descriptor: &LayerDescriptor) -> Self {
        Self {
            palette: descriptor.palette.clone(),
            units: descriptor.units.clone(),
            opacity: descriptor.opacity,
        }
    }
}

/// Load state of one (group, level) after a frame was recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
    /// 0..=100
    pub percent: f64,
    /// This frame was the last one missing
    pub completed_now: bool,
}

/// All layers of one variable.
#[derive(Debug, Clone)]
pub struct LayerGroup {
    variable: String,
    display_name: String,
    /// Level -> descriptors in upstream (time-ascending) order
    layers: BTreeMap<i32, Vec<LayerDescriptor>>,
    loaded: HashMap<i32, usize>,
    selected_level: i32,
    visible: bool,
    style: Option<GroupStyle>,
    opacity_override: Option<f64>,
    initially_visible: bool,
}

impl LayerGroup {
    fn new(first: &LayerDescriptor) -> Self {
        Self {
            variable: first.variable.clone(),
            display_name: first.display_name.clone(),
            layers: BTreeMap::new(),
            loaded: HashMap::new(),
            selected_level: first.level,
            visible: false,
            style: None,
            opacity_override: None,
            initially_visible: false,
        }
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Available levels, ascending.
    pub fn levels(&self) -> impl Iterator<Item = i32> + '_ {
        self.layers.keys().copied()
    }

    pub fn has_level(&self, level: i32) -> bool {
        self.layers.contains_key(&level)
    }

    /// Descriptors at a level, in upstream order.
    pub fn layers_at(&self, level: i32) -> &[LayerDescriptor] {
        self.layers.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Valid times at a level, in upstream order.
    pub fn times_at(&self, level: i32) -> Vec<ValidTime> {
        self.layers_at(level).iter().map(|l| l.valid_time).collect()
    }

    pub fn total_at(&self, level: i32) -> usize {
        self.layers_at(level).len()
    }

    pub fn loaded_at(&self, level: i32) -> usize {
        self.loaded.get(&level).copied().unwrap_or(0)
    }

    /// `loaded / total * 100`, or 0 when the level has no layers.
    pub fn progress_for(&self, level: i32) -> f64 {
        let total = self.total_at(level);
        if total == 0 {
            return 0.0;
        }
        self.loaded_at(level) as f64 / total as f64 * 100.0
    }

    pub fn is_complete(&self, level: i32) -> bool {
        self.loaded_at(level) == self.total_at(level)
    }

    /// Progress at the selected level.
    pub fn progress(&self) -> f64 {
        self.progress_for(self.selected_level)
    }

    pub fn selected_level(&self) -> i32 {
        self.selected_level
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether upstream listed any of this group's layers as visible.
    pub fn initially_visible(&self) -> bool {
        self.initially_visible
    }

    pub fn units(&self) -> &str {
        self.style
            .as_ref()
            .map(|s| s.units.as_str())
            .or_else(|| self.first_descriptor().map(|d| d.units.as_str()))
            .unwrap_or_default()
    }

    pub fn palette(&self) -> &str {
        self.style
            .as_ref()
            .map(|s| s.palette.as_str())
            .or_else(|| self.first_descriptor().map(|d| d.palette.as_str()))
            .unwrap_or_default()
    }

    /// Opacity applied to newly realized frames.
    pub fn opacity(&self) -> f64 {
        if let Some(opacity) = self.opacity_override {
            return opacity;
        }
        self.style
            .as_ref()
            .map(|s| s.opacity)
            .or_else(|| self.first_descriptor().map(|d| d.opacity))
            .unwrap_or(1.0)
    }

    pub fn find(&self, valid_time: ValidTime, level: i32) -> Option<&LayerDescriptor> {
        self.layers_at(level)
            .iter()
            .find(|l| l.valid_time == valid_time)
    }

    fn first_descriptor(&self) -> Option<&LayerDescriptor> {
        self.layers.values().next().and_then(|v| v.first())
    }
}

/// All layer groups of a job.
#[derive(Debug, Clone, Default)]
pub struct LayerCatalog {
    /// Groups in order of first appearance
    groups: Vec<LayerGroup>,
    index: HashMap<String, usize>,
}

impl LayerCatalog {
    /// Group descriptors by variable, then by level.
    ///
    /// Descriptor order within a level is kept as given (time-ascending
    /// upstream). Levels were already normalized (null -> 0) on decode.
    pub fn build(descriptors: impl IntoIterator<Item = LayerDescriptor>) -> Self {
        let mut catalog = Self::default();

        for descriptor in descriptors {
            let slot = match catalog.index.get(&descriptor.variable) {
                Some(&slot) => slot,
                None => {
                    catalog.groups.push(LayerGroup::new(&descriptor));
                    let slot = catalog.groups.len() - 1;
                    catalog.index.insert(descriptor.variable.clone(), slot);
                    slot
                }
            };

            let group = &mut catalog.groups[slot];
            group.initially_visible |= descriptor.visible;
            group
                .layers
                .entry(descriptor.level)
                .or_default()
                .push(descriptor);
        }

        for group in &mut catalog.groups {
            // Start on the lowest level (surface for 2-D fields)
            if let Some(level) = group.layers.keys().next() {
                group.selected_level = *level;
            }
            debug!(
                variable = %group.variable,
                levels = group.layers.len(),
                frames = group.layers.values().map(Vec::len).sum::<usize>(),
                "Built layer group"
            );
        }

        catalog
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in order of first appearance.
    pub fn groups(&self) -> impl Iterator<Item = &LayerGroup> {
        self.groups.iter()
    }

    pub fn group(&self, variable: &str) -> Option<&LayerGroup> {
        self.index.get(variable).map(|&slot| &self.groups[slot])
    }

    fn group_mut(&mut self, variable: &str) -> Option<&mut LayerGroup> {
        match self.index.get(variable) {
            Some(&slot) => Some(&mut self.groups[slot]),
            None => None,
        }
    }

    /// Look up a group, failing with [`ViewerError::UnknownGroup`].
    pub fn require(&self, variable: &str) -> ViewerResult<&LayerGroup> {
        self.group(variable)
            .ok_or_else(|| ViewerError::UnknownGroup(variable.to_string()))
    }

    /// The descriptor for (variable, time, level), if the job has one.
    pub fn find_descriptor(
        &self,
        variable: &str,
        valid_time: ValidTime,
        level: i32,
    ) -> Option<&LayerDescriptor> {
        self.group(variable)?.find(valid_time, level)
    }

    pub fn progress_for(&self, variable: &str, level: i32) -> f64 {
        self.group(variable)
            .map(|g| g.progress_for(level))
            .unwrap_or(0.0)
    }

    pub fn is_complete(&self, variable: &str, level: i32) -> bool {
        self.group(variable)
            .map(|g| g.is_complete(level))
            .unwrap_or(false)
    }

    /// Count one materialized frame toward its group and level.
    ///
    /// The caller records each frame once; the counter never decreases and
    /// never exceeds the level's layer count. The first recorded frame also
    /// fixes the group's shared style.
    pub fn record_loaded(&mut self, descriptor: &LayerDescriptor) -> Option<LoadProgress> {
        let group = self.group_mut(&descriptor.variable)?;
        let level = descriptor.level;
        let total = group.total_at(level);

        let loaded = group.loaded.entry(level).or_insert(0);
        let before = *loaded;
        if *loaded < total {
            *loaded += 1;
        }
        let loaded = *loaded;

        if group.style.is_none() {
            group.style = Some(GroupStyle::from_descriptor(descriptor));
        }

        Some(LoadProgress {
            loaded,
            total,
            percent: group.progress_for(level),
            completed_now: before < total && loaded == total,
        })
    }

    /// The visible group, if any.
    pub fn visible_group(&self) -> Option<&LayerGroup> {
        self.groups.iter().find(|g| g.visible)
    }

    /// Make `variable` the only visible group, or hide all with `None`.
    ///
    /// Every group is hidden before the chosen one is shown. Returns the
    /// variables that were visible before the call, including `variable`
    /// itself when it already was.
    pub fn set_visible_group(&mut self, variable: Option<&str>) -> ViewerResult<Vec<String>> {
        if let Some(name) = variable {
            self.require(name)?;
        }

        let mut previously_visible = Vec::new();
        for group in &mut self.groups {
            if group.visible {
                previously_visible.push(group.variable.clone());
            }
            group.visible = false;
        }

        if let Some(group) = variable.and_then(|name| self.group_mut(name)) {
            group.visible = true;
        }

        Ok(previously_visible)
    }

    /// Select the level shown for a group. Returns the previous level.
    pub fn set_selected_level(&mut self, variable: &str, level: i32) -> ViewerResult<i32> {
        let group = self
            .group_mut(variable)
            .ok_or_else(|| ViewerError::UnknownGroup(variable.to_string()))?;
        if !group.has_level(level) {
            return Err(ViewerError::UnknownLevel {
                variable: variable.to_string(),
                level,
            });
        }
        Ok(std::mem::replace(&mut group.selected_level, level))
    }

    /// Set the opacity used for a group's current and future frames.
    pub fn set_opacity(&mut self, variable: &str, opacity: f64) -> ViewerResult<()> {
        let group = self
            .group_mut(variable)
            .ok_or_else(|| ViewerError::UnknownGroup(variable.to_string()))?;
        group.opacity_override = Some(opacity);
        Ok(())
    }
}
