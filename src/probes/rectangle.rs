use super::{Probe, ProbeEnv, ProbeKind, ProbeOutcome};
use crate::rectangle::{Dimension, Rectangle};

/// Iterates a rectangle and prints each element.
pub struct RectangleDemo {
    rect: Rectangle,
}

impl RectangleDemo {
    pub fn new(rect: Rectangle) -> Self {
        Self { rect }
    }
}

impl Default for RectangleDemo {
    fn default() -> Self {
        Self::new(Rectangle::new(10, 5))
    }
}

impl Probe for RectangleDemo {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Rectangle
    }

    fn question(&self) -> &'static str {
        "Rectangle Class Demonstration"
    }

    fn run(&self, env: &mut ProbeEnv<'_>) -> anyhow::Result<ProbeOutcome> {
        env.reporter.info(&format!(
            "Iterating over Rectangle({}, {}):",
            self.rect.width, self.rect.height
        ))?;
        let items: Vec<Dimension> = self.rect.iter().collect();
        for item in &items {
            env.reporter.info(&item.to_string())?;
        }

        let holds = items == [Dimension::Width(self.rect.width), Dimension::Height(self.rect.height)];
        Ok(ProbeOutcome {
            probe: self.kind(),
            holds,
            conclusion: format!("Rectangle yielded {} dimensions.", items.len()),
        })
    }
}
