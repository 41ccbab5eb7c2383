use super::surface::{Paint, Point, RenderSurface, TextStyle};
use crate::error::{AstrologyError, Result};
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;

/// Double-buffered SVG target. Drawing goes into a pending frame; only a
/// successful `commit` replaces the visible document.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    background: Option<String>,
    pending: Vec<String>,
    committed: Option<String>,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

fn finite(values: &[f64], what: &str) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(AstrologyError::Render(format!("non-finite coordinate in {}", what)))
    }
}

fn paint_attrs(paint: &Paint) -> String {
    let mut attrs = String::new();
    match &paint.fill {
        Some(fill) => {
            let _ = write!(attrs, " fill=\"{}\"", escape(fill));
        }
        None => attrs.push_str(" fill=\"none\""),
    }
    if let Some(stroke) = &paint.stroke {
        let _ = write!(
            attrs,
            " stroke=\"{}\" stroke-width=\"{:.2}\"",
            escape(stroke),
            paint.width
        );
        if paint.dashed {
            attrs.push_str(" stroke-dasharray=\"4 3\"");
        }
    }
    attrs
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: None,
            pending: Vec::new(),
            committed: None,
        }
    }

    pub fn with_background(mut self, color: &str) -> Self {
        self.background = Some(color.to_string());
        self
    }

    /// Last committed document, if any frame has completed.
    pub fn document(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    /// Writes the committed document through a temp file in the target
    /// directory, so a reader never sees a half-written image.
    pub fn save(&self, path: &Path) -> Result<()> {
        let document = self
            .document()
            .ok_or_else(|| AstrologyError::Render("nothing has been rendered yet".to_string()))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(document.as_bytes())?;
        tmp.persist(path).map_err(|e| AstrologyError::Io(e.error))?;
        Ok(())
    }
}

impl RenderSurface for SvgSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.pending.clear();
        if let Some(bg) = &self.background {
            self.pending.push(format!(
                "<rect x=\"0\" y=\"0\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
                self.width,
                self.height,
                escape(bg)
            ));
        }
    }

    fn line(&mut self, from: Point, to: Point, paint: &Paint) -> Result<()> {
        finite(&[from.x, from.y, to.x, to.y], "line")?;
        self.pending.push(format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\"{}/>",
            from.x,
            from.y,
            to.x,
            to.y,
            paint_attrs(paint)
        ));
        Ok(())
    }

    fn circle(&mut self, center: Point, radius: f64, paint: &Paint) -> Result<()> {
        finite(&[center.x, center.y, radius], "circle")?;
        self.pending.push(format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\"{}/>",
            center.x,
            center.y,
            radius,
            paint_attrs(paint)
        ));
        Ok(())
    }

    fn text(&mut self, at: Point, text: &str, style: &TextStyle) -> Result<()> {
        finite(&[at.x, at.y], "text")?;
        self.pending.push(format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{:.1}\" fill=\"{}\"{} text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>",
            at.x,
            at.y,
            style.size,
            escape(&style.color),
            if style.bold { " font-weight=\"bold\"" } else { "" },
            escape(text)
        ));
        Ok(())
    }

    fn wedge(
        &mut self,
        center: Point,
        inner: f64,
        outer: f64,
        start: f64,
        end: f64,
        paint: &Paint,
    ) -> Result<()> {
        finite(&[center.x, center.y, inner, outer, start, end], "wedge")?;
        let at = |r: f64, a: f64| Point::new(center.x + r * a.cos(), center.y + r * a.sin());
        let (o1, o2) = (at(outer, start), at(outer, end));
        let (i1, i2) = (at(inner, start), at(inner, end));
        let large = if (end - start).abs() > PI { 1 } else { 0 };
        let sweep = if end > start { 1 } else { 0 };
        self.pending.push(format!(
            "<path d=\"M {:.2} {:.2} A {:.2} {:.2} 0 {} {} {:.2} {:.2} L {:.2} {:.2} A {:.2} {:.2} 0 {} {} {:.2} {:.2} Z\"{}/>",
            o1.x, o1.y,
            outer, outer, large, sweep, o2.x, o2.y,
            i2.x, i2.y,
            inner, inner, large, 1 - sweep, i1.x, i1.y,
            paint_attrs(paint)
        ));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let mut document = String::new();
        let _ = write!(
            document,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.2} {h:.2}\">\n",
            w = self.width,
            h = self.height
        );
        for element in self.pending.drain(..) {
            document.push_str(&element);
            document.push('\n');
        }
        document.push_str("</svg>\n");
        self.committed = Some(document);
        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}
