use egui::{Color32, Pos2, Rect, Stroke, Vec2, emath::RectTransform, vec2};
use gv_core::graph::NodeShape;

use crate::{
    common::{ARROW_LENGTH, ARROW_WIDTH, RADIUS_NODE, TEXT_SIZE},
    view::{EdgeDraw, NodeDraw, ViewModel},
};

const STROKE_WIDTH: f32 = 0.02;

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Line {
        start: Pos2,
        end: Pos2,
        stroke: Stroke,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Option<Color32>,
        stroke: Stroke,
    },
    Rectangle {
        rect: Rect,
        fill: Option<Color32>,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Pos2>,
        fill: Option<Color32>,
        stroke: Stroke,
    },
    Text {
        text: String,
        center: Pos2,
        size: f32,
        color: Color32,
    },
}

/// Drawing primitives in layout units, with the origin at the top-left corner of the drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct Shapes {
    pub shapes: Vec<Shape>,
    pub size: Vec2,
}

impl Shape {
    pub(crate) fn apply_transform(&mut self, transform: &RectTransform) {
        let scale = transform.scale().min_elem();
        match self {
            Shape::Line { start, end, stroke } => {
                *start = transform.transform_pos(*start);
                *end = transform.transform_pos(*end);
                stroke.width *= scale;
            }
            Shape::Circle {
                center,
                radius,
                stroke,
                ..
            } => {
                *center = transform.transform_pos(*center);
                *radius *= scale;
                stroke.width *= scale;
            }
            Shape::Rectangle { rect, stroke, .. } => {
                *rect = transform.transform_rect(*rect);
                stroke.width *= scale;
            }
            Shape::Polygon { points, stroke, .. } => {
                for point in points {
                    *point = transform.transform_pos(*point);
                }
                stroke.width *= scale;
            }
            Shape::Text { center, size, .. } => {
                *center = transform.transform_pos(*center);
                *size *= scale;
            }
        }
    }

    pub(crate) fn bounding_box(&self) -> Rect {
        match self {
            Shape::Line { start, end, .. } => Rect::from_two_pos(*start, *end),
            Shape::Circle { center, radius, .. } => {
                Rect::from_center_size(*center, Vec2::splat(*radius * 2.0))
            }
            Shape::Rectangle { rect, .. } => *rect,
            Shape::Polygon { points, .. } => Rect::from_points(points),
            Shape::Text { center, size, .. } => Rect::from_center_size(*center, Vec2::splat(*size)),
        }
    }
}

fn edge_shapes(shapes: &mut Vec<Shape>, edge: &EdgeDraw, offset: Vec2) {
    let (from, to) = (edge.from - offset, edge.to - offset);
    let stroke = Stroke::new(
        STROKE_WIDTH,
        edge.highlight.color().unwrap_or(Color32::BLACK),
    );

    let label_at;
    if from == to {
        let center = from - vec2(0.0, RADIUS_NODE * 1.5);
        shapes.push(Shape::Circle {
            center,
            radius: RADIUS_NODE * 0.75,
            fill: None,
            stroke,
        });
        label_at = center - vec2(0.0, RADIUS_NODE);
    } else {
        let delta = to - from;
        let direction = delta.normalized();
        if delta.length() <= 2.0 * RADIUS_NODE {
            return;
        }
        let start = from + direction * RADIUS_NODE;
        let mut end = to - direction * RADIUS_NODE;
        if edge.directed {
            let base = end - direction * ARROW_LENGTH;
            let side = direction.rot90() * (ARROW_WIDTH / 2.0);
            shapes.push(Shape::Polygon {
                points: vec![end, base + side, base - side],
                fill: Some(stroke.color),
                stroke,
            });
            end = base;
        }
        shapes.push(Shape::Line { start, end, stroke });
        label_at = from + delta / 2.0 + direction.rot90() * TEXT_SIZE;
    }

    if let Some(weight) = &edge.weight_label {
        shapes.push(Shape::Text {
            text: weight.clone(),
            center: label_at,
            size: TEXT_SIZE,
            color: Color32::DARK_GRAY,
        });
    }
}

fn node_shapes(shapes: &mut Vec<Shape>, node: &NodeDraw, offset: Vec2) {
    let center = node.position - offset;
    let mut fill = node
        .highlight
        .color()
        .or(node.style.color)
        .unwrap_or(Color32::WHITE);
    if !node.enabled {
        fill = fill.gamma_multiply(0.35);
    }
    let width = if node.pinned {
        STROKE_WIDTH * 2.0
    } else {
        STROKE_WIDTH
    };
    let stroke = Stroke::new(width, Color32::BLACK);

    shapes.push(match node.style.shape {
        NodeShape::Circle => Shape::Circle {
            center,
            radius: RADIUS_NODE,
            fill: Some(fill),
            stroke,
        },
        NodeShape::Square => Shape::Rectangle {
            rect: Rect::from_center_size(center, Vec2::splat(RADIUS_NODE * 2.0)),
            fill: Some(fill),
            stroke,
        },
        NodeShape::Diamond => Shape::Polygon {
            points: vec![
                center - vec2(0.0, RADIUS_NODE),
                center + vec2(RADIUS_NODE, 0.0),
                center + vec2(0.0, RADIUS_NODE),
                center - vec2(RADIUS_NODE, 0.0),
            ],
            fill: Some(fill),
            stroke,
        },
    });
    shapes.push(Shape::Text {
        text: node.label.clone(),
        center,
        size: TEXT_SIZE,
        color: Color32::BLACK,
    });
    if let Some(annotation) = node.annotation {
        shapes.push(Shape::Text {
            text: annotation.to_string(),
            center: center - vec2(0.0, RADIUS_NODE + TEXT_SIZE),
            size: TEXT_SIZE,
            color: Color32::DARK_BLUE,
        });
    }
}

impl Shapes {
    /// Edges are drawn first so that nodes cover their ends.
    #[must_use]
    pub fn from_view(view: &ViewModel) -> Self {
        let offset = view.bounds.min.to_vec2();
        let mut shapes = vec![];
        for edge in &view.edges {
            edge_shapes(&mut shapes, edge, offset);
        }
        for node in &view.nodes {
            node_shapes(&mut shapes, node, offset);
        }
        Shapes {
            shapes,
            size: view.bounds.size(),
        }
    }

    /// Smallest rectangle containing every shape.
    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        self.shapes
            .iter()
            .map(Shape::bounding_box)
            .fold(Rect::NOTHING, |acc, rect| acc.union(rect))
    }
}

#[cfg(test)]
mod tests {
    use egui::{Color32, Rect, Stroke, emath::RectTransform, pos2, vec2};
    use gv_core::graph::{EdgeId, NodeId, NodeShape, Style};

    use super::{Shape, Shapes};
    use crate::view::{EdgeDraw, Highlight, NodeDraw, ViewModel};

    fn node(id: usize, x: f32, shape: NodeShape) -> NodeDraw {
        NodeDraw {
            id: NodeId(id),
            position: pos2(x, 0.0),
            label: format!("v{id}"),
            style: Style { color: None, shape },
            highlight: Highlight::None,
            annotation: None,
            enabled: true,
            pinned: false,
        }
    }

    fn view(directed: bool) -> ViewModel {
        ViewModel {
            nodes: vec![node(0, 0.0, NodeShape::Circle), node(1, 2.0, NodeShape::Diamond)],
            edges: vec![EdgeDraw {
                id: EdgeId(0),
                from: pos2(0.0, 0.0),
                to: pos2(2.0, 0.0),
                weight_label: Some("3".to_owned()),
                directed,
                highlight: Highlight::Tree,
            }],
            bounds: Rect::from_min_max(pos2(-0.5, -0.5), pos2(2.5, 0.5)),
            stable: true,
            run: None,
        }
    }

    #[test]
    fn directed_edges_get_arrow_heads() {
        let shapes = Shapes::from_view(&view(true));
        let polygons = shapes
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Polygon { .. }))
            .count();
        // One arrow head and one diamond.
        assert_eq!(polygons, 2);
        assert_eq!(shapes.size, vec2(3.0, 1.0));

        let undirected = Shapes::from_view(&view(false));
        assert_eq!(undirected.shapes.len(), shapes.shapes.len() - 1);
    }

    #[test]
    fn lines_stop_at_node_boundaries() {
        let shapes = Shapes::from_view(&view(false));
        let Some(Shape::Line { start, end, stroke }) = shapes.shapes.first().cloned() else {
            panic!("edge line should come first");
        };
        assert!(start.distance(pos2(0.7, 0.5)) < 1e-5);
        assert!(end.distance(pos2(2.3, 0.5)) < 1e-5);
        assert_eq!(stroke.color, Highlight::Tree.color().unwrap());
    }

    #[test]
    fn transform_scales_geometry() {
        let mut shape = Shape::Circle {
            center: pos2(1.0, 1.0),
            radius: 0.5,
            fill: Some(Color32::WHITE),
            stroke: Stroke::new(0.1, Color32::BLACK),
        };
        let transform = RectTransform::from_to(
            Rect::from_min_size(pos2(0.0, 0.0), vec2(1.0, 1.0)),
            Rect::from_min_size(pos2(0.0, 0.0), vec2(10.0, 10.0)),
        );
        shape.apply_transform(&transform);
        assert_eq!(
            shape,
            Shape::Circle {
                center: pos2(10.0, 10.0),
                radius: 5.0,
                fill: Some(Color32::WHITE),
                stroke: Stroke::new(1.0, Color32::BLACK),
            }
        );
    }
}
