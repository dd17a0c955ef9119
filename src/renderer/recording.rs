//! A [`Gfx`] that only records what it was asked to do.

use crate::renderer::{
    Bindings, BufferId, BufferUsage, Gfx, ImageDesc, ImageId, PassAction, PipelineDesc,
    PipelineId, SamplerDesc, SamplerId, UniformSlot, ViewId,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    BeginPass(PassAction),
    ApplyPipeline(PipelineId),
    ApplyBindings(Bindings),
    ApplyUniforms(UniformSlot, Vec<u8>),
    Draw {
        base_element: usize,
        num_elements: usize,
        num_instances: usize,
    },
    EndPass,
    Commit,
}

#[derive(Default)]
pub struct RecordingGfx {
    next_id: u32,
    pub commands: Vec<Command>,
    /// Initialized buffers in initialization order.
    pub initialized_buffers: Vec<(BufferId, BufferUsage, Vec<u8>)>,
    /// Created images with their width, height and whether they have mipmaps.
    pub images: Vec<(ImageId, u32, u32, bool)>,
    pub samplers: Vec<(SamplerId, SamplerDesc)>,
    pub pipelines: Vec<(PipelineId, PipelineDesc)>,
    pub live_objects: usize,
}

impl RecordingGfx {
    pub fn new() -> RecordingGfx {
        RecordingGfx::default()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.live_objects += 1;
        self.next_id
    }

    pub fn draws(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::Draw { .. }))
            .count()
    }

    pub fn bindings(&self) -> Vec<Bindings> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::ApplyBindings(bindings) => Some(*bindings),
                _ => None,
            })
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}

impl Gfx for RecordingGfx {
    fn alloc_buffer(&mut self) -> BufferId {
        BufferId(self.next_id())
    }

    fn init_buffer(&mut self, buffer: BufferId, usage: BufferUsage, data: &[u8]) {
        self.initialized_buffers.push((buffer, usage, data.to_vec()));
    }

    fn make_image(&mut self, desc: &ImageDesc) -> ImageId {
        assert_eq!(desc.pixels.len(), (desc.width * desc.height * 4) as usize);
        let id = ImageId(self.next_id());
        self.images
            .push((id, desc.width, desc.height, desc.mipmaps));
        id
    }

    fn make_view(&mut self, _image: ImageId) -> ViewId {
        ViewId(self.next_id())
    }

    fn make_sampler(&mut self, desc: &SamplerDesc) -> SamplerId {
        let id = SamplerId(self.next_id());
        self.samplers.push((id, *desc));
        id
    }

    fn make_pipeline(&mut self, desc: &PipelineDesc) -> PipelineId {
        let id = PipelineId(self.next_id());
        self.pipelines.push((id, *desc));
        id
    }

    fn begin_pass(&mut self, action: &PassAction) {
        self.commands.push(Command::BeginPass(*action));
    }

    fn apply_pipeline(&mut self, pipeline: PipelineId) {
        self.commands.push(Command::ApplyPipeline(pipeline));
    }

    fn apply_bindings(&mut self, bindings: &Bindings) {
        self.commands.push(Command::ApplyBindings(*bindings));
    }

    fn apply_uniforms(&mut self, slot: UniformSlot, data: &[u8]) {
        self.commands.push(Command::ApplyUniforms(slot, data.to_vec()));
    }

    fn draw(&mut self, base_element: usize, num_elements: usize, num_instances: usize) {
        self.commands.push(Command::Draw {
            base_element,
            num_elements,
            num_instances,
        });
    }

    fn end_pass(&mut self) {
        self.commands.push(Command::EndPass);
    }

    fn commit(&mut self) {
        self.commands.push(Command::Commit);
    }

    fn destroy_buffer(&mut self, _buffer: BufferId) {
        self.live_objects -= 1;
    }

    fn destroy_image(&mut self, _image: ImageId) {
        self.live_objects -= 1;
    }

    fn destroy_view(&mut self, _view: ViewId) {
        self.live_objects -= 1;
    }

    fn destroy_sampler(&mut self, _sampler: SamplerId) {
        self.live_objects -= 1;
    }

    fn destroy_pipeline(&mut self, _pipeline: PipelineId) {
        self.live_objects -= 1;
    }
}
