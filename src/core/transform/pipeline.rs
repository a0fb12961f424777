use super::{eol_transform, filter_transform, Transform};
use crate::domain::config::{EolMode, FilterKind};
use std::fmt;
use std::sync::Arc;

/// Ordered chain of transforms.
///
/// Outbound order is the end-of-line transform followed by the filters as
/// configured; inbound order is the exact reverse. A pipeline is immutable
/// once built; reconfiguration builds a new one.
#[derive(Clone)]
pub struct Pipeline {
    eol: EolMode,
    filters: Vec<FilterKind>,
    tx_transformations: Vec<Arc<dyn Transform>>,
    rx_transformations: Vec<Arc<dyn Transform>>,
}

impl Pipeline {
    pub fn new(eol: EolMode, filters: &[FilterKind]) -> Self {
        let transformations = std::iter::once(eol_transform(eol))
            .chain(filters.iter().map(|kind| filter_transform(*kind)))
            .map(Arc::<dyn Transform>::from)
            .collect();
        Self::from_transforms(eol, filters, transformations)
    }

    /// Build from already instantiated transforms, in outbound order
    pub fn from_transforms(
        eol: EolMode,
        filters: &[FilterKind],
        tx_transformations: Vec<Arc<dyn Transform>>,
    ) -> Self {
        let rx_transformations = tx_transformations.iter().rev().cloned().collect();
        Self {
            eol,
            filters: filters.to_vec(),
            tx_transformations,
            rx_transformations,
        }
    }

    pub fn eol(&self) -> EolMode {
        self.eol
    }

    pub fn filters(&self) -> &[FilterKind] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.tx_transformations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx_transformations.is_empty()
    }

    /// Apply inbound transforms, channel to console
    pub fn rx(&self, text: String) -> String {
        self.rx_transformations
            .iter()
            .fold(text, |text, transformation| transformation.rx(text))
    }

    /// Apply outbound transforms, console to channel
    pub fn tx(&self, text: String) -> String {
        self.tx_transformations
            .iter()
            .fold(text, |text, transformation| transformation.tx(text))
    }

    /// Apply echo transforms, in outbound order
    pub fn echo(&self, text: String) -> String {
        self.tx_transformations
            .iter()
            .fold(text, |text, transformation| transformation.echo(text))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(EolMode::default(), &[FilterKind::Default])
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("eol", &self.eol)
            .field("filters", &self.filters)
            .finish()
    }
}
