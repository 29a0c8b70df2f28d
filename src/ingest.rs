//! Fetch → decode → classify → upsert.

use serde::Serialize;

use crate::bounds::BoundingBox;
use crate::error::{DecodeError, IngestError};
use crate::overpass::{ElementKind, RawElement, WaySource};
use crate::roads::geometry;
use crate::roads::{AccessibilityClassifier, RoadAttributes};
use crate::store::{RoadSegment, RoadStore};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub imported: usize,
    pub skipped: usize,
}

impl IngestionReport {
    pub fn total(&self) -> usize {
        self.imported + self.skipped
    }
}

/// Turns raw source elements into stored road segments.
///
/// Every element gets exactly one attempt per run. A bad element is logged and
/// counted as skipped, it never stops the batch. Only the source fetch and the
/// initial storage check can fail a run.
pub struct IngestionPipeline {
    classifier: AccessibilityClassifier,
}

impl IngestionPipeline {
    pub fn new(classifier: AccessibilityClassifier) -> Self {
        IngestionPipeline { classifier }
    }

    /// One full ingestion run
    ///
    /// # Arguments
    /// * `source` - Where ways are fetched from (one call)
    /// * `bounds` - Area to import
    /// * `store` - Destination, checked before the fetch
    ///
    /// # Returns
    /// Counts of imported and skipped elements. Fails only when the store
    /// check or the fetch fails, in which case nothing is written.
    pub async fn run<W, S>(
        &self,
        source: &W,
        bounds: &BoundingBox,
        store: &S,
    ) -> Result<IngestionReport, IngestError>
    where
        W: WaySource,
        S: RoadStore + ?Sized,
    {
        store.check_connection()?;
        let elements = source.fetch_ways(bounds).await?;

        Ok(self.import_ways(&elements, store))
    }

    /// Import an already fetched batch
    pub fn import_ways<S: RoadStore + ?Sized>(
        &self,
        elements: &[RawElement],
        store: &S,
    ) -> IngestionReport {
        let mut report = IngestionReport::default();

        for element in elements {
            let segment = match self.prepare(element) {
                Ok(segment) => segment,
                Err(e) => {
                    log::debug!("Skipping element {}: {}", element.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            match store.upsert(segment) {
                Ok(_) => report.imported += 1,
                Err(e) => {
                    log::warn!("Failed to import way {}: {}", element.id, e);
                    report.skipped += 1;
                }
            }
        }

        log::info!(
            "Ingestion finished: {} imported, {} skipped",
            report.imported,
            report.skipped
        );
        report
    }

    /// Decode and classify one element without touching storage
    ///
    /// # Arguments
    /// * `element` - Raw Overpass element, expected to be a tagged way
    ///
    /// # Returns
    /// Segment ready for upsert, or the reason the element is skipped
    pub fn prepare(&self, element: &RawElement) -> Result<RoadSegment, DecodeError> {
        if element.kind != ElementKind::Way {
            return Err(DecodeError::NotAWay);
        }

        let tags = element.tags.as_ref().ok_or(DecodeError::MissingHighway)?;
        let highway = element
            .tag("highway")
            .filter(|h| !h.is_empty())
            .ok_or(DecodeError::MissingHighway)?;

        let line = geometry::decode(&element.vertices()?);
        if line.0.len() < 2 {
            return Err(DecodeError::TooFewPoints(line.0.len()));
        }

        let classification = self.classifier.classify(tags);
        if !classification.is_accessible {
            if let Some(rule) = self.classifier.rejection(&RoadAttributes::from_tags(tags)) {
                log::debug!("Way {} ({}) is not accessible: {}", element.id, highway, rule);
            }
        }

        Ok(RoadSegment {
            external_id: element.id,
            name: element.tag("name").map(str::to_string),
            highway_type: highway.to_string(),
            width_m: classification.width_m,
            max_speed_kph: classification.max_speed_kph,
            is_accessible: classification.is_accessible,
            geometry: line,
        })
    }
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(AccessibilityClassifier::new())
    }
}
