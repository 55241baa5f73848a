use crate::config::StencilConfig;
use crate::geometry::Placement;
use crate::loader::ImageSource;

/// Everything the presentation layer and the drawing surface read.
#[derive(Clone, Debug)]
pub struct EditorState {
    pub image_source: Option<ImageSource>,
    /// Bumped on every new source, including re-uploads of the same file.
    pub source_generation: u64,
    pub placement: Placement,
    /// First cover-fit placement of the current image, kept for reset.
    pub initial_placement: Option<Placement>,
    pub stencil: StencilConfig,
}

impl EditorState {
    pub fn new(stencil: StencilConfig) -> Self {
        Self {
            image_source: None,
            source_generation: 0,
            placement: Placement::default(),
            initial_placement: None,
            stencil,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_source.is_some()
    }
}

#[derive(Clone, Debug)]
pub enum Action {
    SetImageSource(ImageSource),
    SetPlacement(Placement),
    SetInitialPlacement(Placement),
    Reset,
    SetScale(f32),
    SetPosition { left: f32, top: f32 },
    /// The stencil moved to a new center; the reset target follows it.
    Recenter { left: f32, top: f32 },
}

pub struct EditorStore {
    state: EditorState,
}

impl EditorStore {
    pub fn new(stencil: StencilConfig) -> Self {
        Self {
            state: EditorState::new(stencil),
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        log::trace!("dispatch {action:?}");
        let state = &mut self.state;
        match action {
            Action::SetImageSource(source) => {
                state.image_source = Some(source);
                state.source_generation = state.source_generation.wrapping_add(1);
                state.placement = Placement::default();
                state.initial_placement = None;
            }
            Action::SetPlacement(placement) => {
                state.placement = placement;
            }
            Action::SetInitialPlacement(placement) => {
                if state.initial_placement.is_none() {
                    state.initial_placement = Some(placement);
                }
                state.placement = placement;
            }
            Action::Reset => {
                if let Some(initial) = state.initial_placement {
                    state.placement = initial;
                }
            }
            Action::SetScale(scale) => {
                state.placement.scale = scale;
            }
            Action::SetPosition { left, top } => {
                state.placement.left = left;
                state.placement.top = top;
            }
            Action::Recenter { left, top } => {
                if let Some(initial) = state.initial_placement.as_mut() {
                    initial.left = left;
                    initial.top = top;
                }
            }
        }
    }
}
