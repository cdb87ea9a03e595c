use egui::{Color32, Pos2, Rect, emath::RectTransform};
use itertools::Itertools;
use svg::{
    Document, Node,
    node::element::{Circle, Line, Polygon, Rectangle, Text},
};

use crate::shape::{Shape, Shapes};

fn paint(color: Option<Color32>) -> String {
    match color {
        Some(color) if color.a() == 0xff => {
            format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
        }
        Some(color) => {
            let [r, g, b, a] = color.to_srgba_unmultiplied();
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
        None => "none".to_owned(),
    }
}

impl Shape {
    pub(crate) fn to_svg(&self) -> Box<dyn Node> {
        match self {
            Self::Line { start, end, stroke } => Box::new(
                Line::new()
                    .set("x1", start.x)
                    .set("y1", start.y)
                    .set("x2", end.x)
                    .set("y2", end.y)
                    .set("stroke", paint(Some(stroke.color)))
                    .set("stroke-width", stroke.width),
            ),
            Self::Circle {
                center,
                radius,
                fill,
                stroke,
            } => Box::new(
                Circle::new()
                    .set("cx", center.x)
                    .set("cy", center.y)
                    .set("r", *radius)
                    .set("fill", paint(*fill))
                    .set("stroke", paint(Some(stroke.color)))
                    .set("stroke-width", stroke.width),
            ),
            Self::Rectangle { rect, fill, stroke } => Box::new(
                Rectangle::new()
                    .set("x", rect.min.x)
                    .set("y", rect.min.y)
                    .set("width", rect.width())
                    .set("height", rect.height())
                    .set("fill", paint(*fill))
                    .set("stroke", paint(Some(stroke.color)))
                    .set("stroke-width", stroke.width),
            ),
            Self::Polygon {
                points,
                fill,
                stroke,
            } => Box::new(
                Polygon::new()
                    .set(
                        "points",
                        points
                            .iter()
                            .map(|point| format!("{},{}", point.x, point.y))
                            .join(" "),
                    )
                    .set("fill", paint(*fill))
                    .set("stroke", paint(Some(stroke.color)))
                    .set("stroke-width", stroke.width),
            ),
            Self::Text {
                text,
                center,
                size,
                color,
            } => Box::new(
                Text::new(text.as_str())
                    .set("x", center.x)
                    .set("y", center.y)
                    .set("font-size", *size)
                    .set("font-family", "monospace")
                    .set("text-anchor", "middle")
                    .set("dominant-baseline", "middle")
                    .set("fill", paint(Some(*color))),
            ),
        }
    }
}

impl Shapes {
    const SCALE: f32 = 100.0;

    #[must_use]
    pub fn to_svg(&self) -> Document {
        let mut document = Document::new()
            .set("width", self.size.x * Self::SCALE)
            .set("height", self.size.y * Self::SCALE);

        let scale = RectTransform::from_to(
            Rect::from_min_size(Pos2::ZERO, self.size),
            Rect::from_min_size(Pos2::ZERO, self.size * Self::SCALE),
        );

        for shape in &self.shapes {
            let mut shape = shape.clone();
            shape.apply_transform(&scale);
            document = document.add(shape.to_svg());
        }

        document
    }
}
