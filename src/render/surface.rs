use crate::error::Result;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at parameter `t` on the segment from `self` to `other`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Stroke and fill for one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub stroke: Option<String>,
    pub fill: Option<String>,
    pub width: f64,
    pub dashed: bool,
}

impl Paint {
    pub fn stroke(color: &str, width: f64) -> Self {
        Self {
            stroke: Some(color.to_string()),
            fill: None,
            width,
            dashed: false,
        }
    }

    pub fn fill(color: &str) -> Self {
        Self {
            stroke: None,
            fill: Some(color.to_string()),
            width: 0.0,
            dashed: false,
        }
    }

    pub fn with_fill(mut self, color: &str) -> Self {
        self.fill = Some(color.to_string());
        self
    }

    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }
}

/// Text is always centered on its anchor point.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub color: String,
    pub size: f64,
    pub bold: bool,
}

impl TextStyle {
    pub fn new(color: &str, size: f64) -> Self {
        Self {
            color: color.to_string(),
            size,
            bold: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Drawing target shared by every chart layout.
///
/// Angles are radians on a y-down surface: 0 points right and positive
/// angles turn clockwise on screen. `clear` opens a new frame; nothing a
/// caller draws is visible until `commit`, and `discard` drops the frame
/// so the previously committed image stays.
pub trait RenderSurface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;

    fn clear(&mut self);
    fn line(&mut self, from: Point, to: Point, paint: &Paint) -> Result<()>;
    fn circle(&mut self, center: Point, radius: f64, paint: &Paint) -> Result<()>;
    fn text(&mut self, at: Point, text: &str, style: &TextStyle) -> Result<()>;
    /// Ring sector between two radii, swept directly from `start` to `end`.
    fn wedge(
        &mut self,
        center: Point,
        inner: f64,
        outer: f64,
        start: f64,
        end: f64,
        paint: &Paint,
    ) -> Result<()>;

    fn commit(&mut self) -> Result<()>;
    fn discard(&mut self);
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use crate::error::AstrologyError;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Line(Point, Point),
        Circle(Point, f64),
        Text(Point, String),
        Wedge(f64, f64),
    }

    /// Keeps every primitive so layouts can be checked without parsing SVG.
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        pub size: (f64, f64),
        pub pending: Vec<Op>,
        pub committed: Vec<Op>,
        pub fail_on_text: Option<String>,
    }

    impl RecordingSurface {
        pub fn new(width: f64, height: f64) -> Self {
            Self {
                size: (width, height),
                ..Default::default()
            }
        }

        pub fn texts(&self) -> Vec<(Point, String)> {
            self.committed
                .iter()
                .filter_map(|op| match op {
                    Op::Text(p, s) => Some((*p, s.clone())),
                    _ => None,
                })
                .collect()
        }

        pub fn text_at(&self, needle: &str) -> Option<Point> {
            self.texts()
                .into_iter()
                .find(|(_, s)| s.contains(needle))
                .map(|(p, _)| p)
        }
    }

    impl RenderSurface for RecordingSurface {
        fn width(&self) -> f64 {
            self.size.0
        }

        fn height(&self) -> f64 {
            self.size.1
        }

        fn clear(&mut self) {
            self.pending.clear();
        }

        fn line(&mut self, from: Point, to: Point, _paint: &Paint) -> Result<()> {
            self.pending.push(Op::Line(from, to));
            Ok(())
        }

        fn circle(&mut self, center: Point, radius: f64, _paint: &Paint) -> Result<()> {
            self.pending.push(Op::Circle(center, radius));
            Ok(())
        }

        fn text(&mut self, at: Point, text: &str, _style: &TextStyle) -> Result<()> {
            if let Some(bad) = &self.fail_on_text {
                if text.contains(bad.as_str()) {
                    return Err(AstrologyError::Render(format!("refused `{}`", text)));
                }
            }
            self.pending.push(Op::Text(at, text.to_string()));
            Ok(())
        }

        fn wedge(
            &mut self,
            _center: Point,
            _inner: f64,
            _outer: f64,
            start: f64,
            end: f64,
            _paint: &Paint,
        ) -> Result<()> {
            self.pending.push(Op::Wedge(start, end));
            Ok(())
        }

        fn commit(&mut self) -> Result<()> {
            self.committed = std::mem::take(&mut self.pending);
            Ok(())
        }

        fn discard(&mut self) {
            self.pending.clear();
        }
    }
}
