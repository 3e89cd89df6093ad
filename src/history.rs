use crate::{
    command::Command,
    math::vec2,
    surface::{PixelBuffer, Surface, SurfaceError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Empty,
    NonEmpty,
}

#[derive(Debug, Default)]
pub struct History {
    applied: Vec<Command>,
    reverted: Vec<Command>,
    limit: Option<usize>,
    /// Pixels of every command evicted from `applied`.
    base: Option<PixelBuffer>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    pub fn state(&self) -> HistoryState {
        if self.applied.is_empty() && self.reverted.is_empty() {
            HistoryState::Empty
        } else {
            HistoryState::NonEmpty
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.applied.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.reverted.is_empty()
    }

    pub fn applied(&self) -> &[Command] {
        &self.applied
    }

    /// Undone commands; the last one is the next to be redone.
    pub fn reverted(&self) -> &[Command] {
        &self.reverted
    }

    pub fn push<S>(&mut self, command: Command, surface: &mut S) -> Result<(), SurfaceError>
    where
        S: Surface + ?Sized,
    {
        command.execute(surface)?;
        log::debug!(
            "pushed {} ({} applied, dropped {} reverted)",
            command.name(),
            self.applied.len() + 1,
            self.reverted.len(),
        );
        self.reverted.clear();
        self.applied.push(command);

        if let Some(limit) = self.limit {
            while self.applied.len() > limit {
                self.bake_oldest(surface)?;
            }
        }
        Ok(())
    }

    pub fn undo<S>(&mut self, surface: &mut S) -> Result<(), SurfaceError>
    where
        S: Surface + ?Sized,
    {
        let Some(command) = self.applied.pop() else {
            return Ok(());
        };
        if let Err(e) = self.redraw(surface) {
            self.applied.push(command);
            return Err(e);
        }
        log::debug!("undid {} ({} applied)", command.name(), self.applied.len());
        self.reverted.push(command);
        Ok(())
    }

    pub fn redo<S>(&mut self, surface: &mut S) -> Result<(), SurfaceError>
    where
        S: Surface + ?Sized,
    {
        let Some(command) = self.reverted.pop() else {
            return Ok(());
        };
        if let Err(e) = command.execute(surface) {
            self.reverted.push(command);
            return Err(e);
        }
        log::debug!("redid {} ({} applied)", command.name(), self.applied.len() + 1);
        self.applied.push(command);
        Ok(())
    }

    pub fn reset<S>(&mut self, surface: &mut S) -> Result<(), SurfaceError>
    where
        S: Surface + ?Sized,
    {
        surface.clear()?;
        log::info!(
            "reset history ({} applied, {} reverted)",
            self.applied.len(),
            self.reverted.len()
        );
        self.applied.clear();
        self.reverted.clear();
        self.base = None;
        Ok(())
    }

    pub fn redraw<S>(&self, surface: &mut S) -> Result<(), SurfaceError>
    where
        S: Surface + ?Sized,
    {
        surface.clear()?;
        if let Some(base) = &self.base {
            surface.put_pixels(base, vec2(0, 0))?;
        }
        for command in &self.applied {
            command.execute(surface)?;
        }
        Ok(())
    }

    fn bake_oldest<S>(&mut self, surface: &mut S) -> Result<(), SurfaceError>
    where
        S: Surface + ?Sized,
    {
        let Some(oldest) = self.applied.first() else {
            return Ok(());
        };

        // Render base + oldest in place, then put the visible pixels back untouched.
        let size = surface.size();
        let visible = surface.get_pixels(vec2(0, 0), size)?;
        surface.clear()?;
        if let Some(base) = &self.base {
            surface.put_pixels(base, vec2(0, 0))?;
        }
        oldest.execute(surface)?;
        let base = surface.get_pixels(vec2(0, 0), size)?;
        surface.put_pixels(&visible, vec2(0, 0))?;

        let oldest = self.applied.remove(0);
        log::debug!("baked {} into the base layer", oldest.name());
        self.base = Some(base);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        color::Rgba,
        math::{vec2, Vec2f},
        raster::Canvas,
        style::{FillMode, RenderPolicy, Style},
    };

    fn rect(from: Vec2f, to: Vec2f, color: &str) -> Command {
        let style = Style {
            primary: color.into(),
            fill: FillMode::FillOnly,
            ..Style::default()
        };
        Command::rectangle(&style, &RenderPolicy::default(), &[from, to]).unwrap()
    }

    /// Overlapping, partly transparent commands, so replay order matters.
    fn commands() -> Vec<Command> {
        vec![
            rect(vec2(0.0, 0.0), vec2(10.0, 10.0), "rgba(255, 0, 0, 0.5)"),
            rect(vec2(5.0, 5.0), vec2(15.0, 15.0), "rgba(0, 255, 0, 0.5)"),
            rect(vec2(3.0, 8.0), vec2(12.0, 12.0), "rgba(0, 0, 255, 0.5)"),
            rect(vec2(1.0, 1.0), vec2(4.0, 14.0), "#ffff00"),
        ]
    }

    fn snapshot(canvas: &Canvas) -> PixelBuffer {
        canvas.pixels().clone()
    }

    fn is_blank(canvas: &Canvas) -> bool {
        canvas.pixels().pixels().iter().all(|p| *p == Rgba::TRANSPARENT)
    }

    #[test]
    fn push_draws_and_tracks_state() {
        let mut canvas = Canvas::new(16, 16);
        let mut history = History::new();
        assert_eq!(history.state(), HistoryState::Empty);
        assert!(!history.can_undo());
        assert!(!history.can_redo());

        history.push(commands().remove(3), &mut canvas).unwrap();
        assert_eq!(history.state(), HistoryState::NonEmpty);
        assert!(history.can_undo());
        assert_eq!(canvas.pixel(2, 2), Some(Rgba::opaque(255, 255, 0)));

        history.undo(&mut canvas).unwrap();
        assert_eq!(history.state(), HistoryState::NonEmpty);
        assert!(history.can_redo());
        assert!(is_blank(&canvas));
    }

    #[test]
    fn undo_then_redo_restores_the_surface() {
        let mut canvas = Canvas::new(16, 16);
        let mut history = History::new();
        let mut after_each = Vec::new();
        for command in commands() {
            history.push(command, &mut canvas).unwrap();
            after_each.push(snapshot(&canvas));
        }

        history.undo(&mut canvas).unwrap();
        assert_eq!(snapshot(&canvas), after_each[2]);
        history.redo(&mut canvas).unwrap();
        assert_eq!(snapshot(&canvas), after_each[3]);

        // Walk all the way back and forth again.
        for expected in after_each[..3].iter().rev() {
            history.undo(&mut canvas).unwrap();
            assert_eq!(&snapshot(&canvas), expected);
        }
        history.undo(&mut canvas).unwrap();
        assert!(is_blank(&canvas));
        for expected in &after_each {
            history.redo(&mut canvas).unwrap();
            assert_eq!(&snapshot(&canvas), expected);
        }
        assert!(!history.can_redo());
    }

    #[test]
    fn new_work_discards_redo_history() {
        let mut canvas = Canvas::new(16, 16);
        let mut history = History::new();
        let mut cmds = commands().into_iter();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();
        history.undo(&mut canvas).unwrap();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();

        assert!(!history.can_redo());
        let before = snapshot(&canvas);
        history.redo(&mut canvas).unwrap();
        assert_eq!(snapshot(&canvas), before);
        assert_eq!(history.applied().len(), 2);
        assert_eq!(history.reverted().len(), 0);
    }

    #[test]
    fn empty_undo_and_redo_are_noops() {
        let mut canvas = Canvas::new(16, 16);
        // Pixels that are not part of any history must survive.
        canvas
            .put_pixels(&PixelBuffer::from_pixels(1, 1, vec![Rgba::BLACK]).unwrap(), vec2(3, 3))
            .unwrap();
        let before = snapshot(&canvas);

        let mut history = History::new();
        history.undo(&mut canvas).unwrap();
        history.redo(&mut canvas).unwrap();
        assert_eq!(snapshot(&canvas), before);
        assert_eq!(history.state(), HistoryState::Empty);
    }

    #[test]
    fn reset_clears_both_histories() {
        let mut canvas = Canvas::new(16, 16);
        let mut history = History::new();
        for command in commands().into_iter().take(3) {
            history.push(command, &mut canvas).unwrap();
        }
        history.undo(&mut canvas).unwrap();
        history.reset(&mut canvas).unwrap();

        assert_eq!(history.state(), HistoryState::Empty);
        assert!(is_blank(&canvas));
        history.undo(&mut canvas).unwrap();
        history.redo(&mut canvas).unwrap();
        assert!(is_blank(&canvas));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn limit_bakes_old_commands_without_changing_the_drawing() {
        let mut limited_canvas = Canvas::new(16, 16);
        let mut limited = History::with_limit(2);
        let mut full_canvas = Canvas::new(16, 16);
        let mut full = History::new();
        for command in commands() {
            limited.push(command.clone(), &mut limited_canvas).unwrap();
            full.push(command, &mut full_canvas).unwrap();
            assert_eq!(snapshot(&limited_canvas), snapshot(&full_canvas));
        }
        assert_eq!(limited.applied().len(), 2);

        for _ in 0..2 {
            limited.undo(&mut limited_canvas).unwrap();
            full.undo(&mut full_canvas).unwrap();
            assert_eq!(snapshot(&limited_canvas), snapshot(&full_canvas));
        }

        // The baked commands are no longer undoable.
        assert!(!limited.can_undo());
        limited.undo(&mut limited_canvas).unwrap();
        assert_eq!(snapshot(&limited_canvas), snapshot(&full_canvas));

        limited.redraw(&mut limited_canvas).unwrap();
        assert_eq!(snapshot(&limited_canvas), snapshot(&full_canvas));
    }

    #[test]
    fn baking_does_not_replay_the_visible_drawing() {
        let mut canvas = Canvas::new(20, 20);
        // Pixels outside of any command survive pushes, which only ever draw on top.
        let stray = PixelBuffer::from_pixels(1, 1, vec![Rgba::WHITE]).unwrap();
        canvas.put_pixels(&stray, vec2(18, 18)).unwrap();

        let mut history = History::with_limit(1);
        let mut cmds = commands().into_iter();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();
        assert_eq!(history.applied().len(), 1);
        assert_eq!(canvas.pixel(18, 18), Some(Rgba::WHITE));

        let mut expected = Canvas::new(20, 20);
        expected.put_pixels(&stray, vec2(18, 18)).unwrap();
        for command in commands().into_iter().take(3) {
            command.execute(&mut expected).unwrap();
        }
        assert_eq!(snapshot(&canvas), snapshot(&expected));

        // The base layer holds exactly the first two commands.
        history.undo(&mut canvas).unwrap();
        let mut expected = Canvas::new(20, 20);
        for command in commands().into_iter().take(2) {
            command.execute(&mut expected).unwrap();
        }
        assert_eq!(snapshot(&canvas), snapshot(&expected));
    }

    #[test]
    fn surface_failures_propagate_and_keep_history() {
        let mut canvas = Canvas::new(16, 16);
        let mut history = History::new();
        let mut cmds = commands().into_iter();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();
        history.push(cmds.next().unwrap(), &mut canvas).unwrap();
        history.undo(&mut canvas).unwrap();

        canvas.detach();
        assert!(matches!(
            history.push(cmds.next().unwrap(), &mut canvas),
            Err(SurfaceError::Detached)
        ));
        assert!(matches!(history.undo(&mut canvas), Err(SurfaceError::Detached)));
        assert!(matches!(history.redo(&mut canvas), Err(SurfaceError::Detached)));
        assert!(matches!(history.reset(&mut canvas), Err(SurfaceError::Detached)));

        assert_eq!(history.applied().len(), 1);
        assert_eq!(history.reverted().len(), 1);
    }
}
