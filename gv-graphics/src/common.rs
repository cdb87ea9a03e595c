pub const RADIUS_NODE: f32 = 0.2;
pub const TEXT_SIZE: f32 = 0.16;
pub const ARROW_LENGTH: f32 = 0.12;
pub const ARROW_WIDTH: f32 = 0.08;
/// Space left around the drawing.
pub const MARGIN: f32 = 0.5;
