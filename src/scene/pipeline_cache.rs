use log::debug;

use crate::renderer::{Gfx, IndexType, PipelineDesc, PipelineId, PrimitiveType, VertexLayout};
use crate::scene::{EntityKind, LoadError};

/// Everything about a primitive that needs its own pipeline object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineKey {
    pub layout: VertexLayout,
    pub primitive_type: PrimitiveType,
    pub index_type: IndexType,
    /// Alpha blended instead of opaque.
    pub alpha: bool,
}

impl PipelineKey {
    fn desc(&self) -> PipelineDesc {
        PipelineDesc {
            layout: self.layout,
            primitive_type: self.primitive_type,
            index_type: self.index_type,
            cull_back_faces: true,
            depth_write: !self.alpha,
            alpha_blend: self.alpha,
        }
    }
}

/// Pipelines shared between all primitives with an equal [`PipelineKey`].
pub struct PipelineCache {
    max: usize,
    entries: Vec<(PipelineKey, PipelineId)>,
}

impl PipelineCache {
    pub fn new(max: usize) -> PipelineCache {
        PipelineCache {
            max,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pipeline(&self, index: usize) -> Option<PipelineId> {
        self.entries.get(index).map(|&(_, id)| id)
    }

    /// Returns the index of the pipeline for `key`, creating it if no equal
    /// key has been seen yet.
    pub fn get_or_create(&mut self, gfx: &mut dyn Gfx, key: &PipelineKey) -> Result<usize, LoadError> {
        if let Some(index) = self.entries.iter().position(|(cached, _)| cached == key) {
            return Ok(index);
        }
        if self.entries.len() >= self.max {
            return Err(LoadError::Capacity {
                kind: EntityKind::Pipelines,
                max: self.max,
            });
        }
        let id = gfx.make_pipeline(&key.desc());
        debug!("Created pipeline {} for {key:?}", self.entries.len());
        self.entries.push((*key, id));
        Ok(self.entries.len() - 1)
    }

    pub fn destroy(&mut self, gfx: &mut dyn Gfx) {
        for (_, id) in self.entries.drain(..) {
            gfx.destroy_pipeline(id);
        }
    }
}
