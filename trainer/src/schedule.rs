use std::num::NonZeroUsize;

/// Defines which micro-steps open and close a network's gradient accumulation window.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    len: NonZeroUsize,
}

impl Window {
    pub fn new(len: NonZeroUsize) -> Self {
        Self { len }
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Returns true if this step starts a window, gradients are zeroed here.
    #[inline]
    pub fn is_first(&self, step: usize) -> bool {
        step % self.len() == 0
    }

    /// Returns true if this step ends a window, the optimizer steps here.
    #[inline]
    pub fn is_last(&self, step: usize) -> bool {
        step % self.len() == self.len() - 1
    }
}

/// Where a single batch step falls within both networks' windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicroStep {
    pub step: usize,
    /// Logical index of the optimizer update this step contributes to.
    pub gradient_step: usize,
    pub first_g: bool,
    pub last_g: bool,
    pub first_d: bool,
    pub last_d: bool,
    /// Whether the generator may update without landing inside an unfinished discriminator window.
    pub g_allowed: bool,
}

/// The generator and discriminator accumulation windows.
#[derive(Debug, Clone, Copy)]
pub struct Accumulation {
    g: Window,
    d: Window,
}

impl Accumulation {
    pub fn new(g: NonZeroUsize, d: NonZeroUsize) -> Self {
        Self {
            g: Window::new(g),
            d: Window::new(d),
        }
    }

    pub fn g(&self) -> Window {
        self.g
    }

    pub fn d(&self) -> Window {
        self.d
    }

    /// Batch steps per logical gradient step.
    pub fn span(&self) -> usize {
        self.g.len().max(self.d.len())
    }

    pub fn gradient_step(&self, step: usize) -> usize {
        step / self.span()
    }

    pub fn micro_step(&self, step: usize) -> MicroStep {
        let (wg, wd) = (self.g.len(), self.d.len());

        MicroStep {
            step,
            gradient_step: self.gradient_step(step),
            first_g: self.g.is_first(step),
            last_g: self.g.is_last(step),
            first_d: self.d.is_first(step),
            last_d: self.d.is_last(step),
            // Only the trailing `wg` steps of a longer discriminator window.
            g_allowed: step % wd + wg >= wd,
        }
    }
}

/// Tracks whether a network is inside a window it opened on that window's first micro-step.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowState {
    open: bool,
}

impl WindowState {
    /// Registers a micro-step on which the network's branch fires.
    ///
    /// # Returns
    /// Whether the branch should run. A window joined halfway is skipped.
    pub fn enter(&mut self, first: bool) -> bool {
        if first {
            self.open = true;
        }
        self.open
    }

    /// Ends the window, either after the optimizer stepped or because the branch stopped firing.
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn window_bounds() {
        let w = Window::new(nz(3));
        assert!(w.is_first(0) && !w.is_last(0));
        assert!(!w.is_first(1) && !w.is_last(1));
        assert!(!w.is_first(2) && w.is_last(2));
        assert!(w.is_first(3));
        assert!(w.is_last(5));
    }

    #[test]
    fn unit_windows_are_first_and_last() {
        let w = Window::new(nz(1));
        assert!((0..4).all(|s| w.is_first(s) && w.is_last(s)));
    }

    #[test]
    fn gradient_step_follows_the_longest_window() {
        let acc = Accumulation::new(nz(2), nz(4));
        let steps: Vec<usize> = (0..10).map(|s| acc.gradient_step(s)).collect();
        assert_eq!(steps, [0, 0, 0, 0, 1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn generator_only_in_the_trailing_part_of_a_longer_d_window() {
        let acc = Accumulation::new(nz(2), nz(6));
        let allowed: Vec<bool> = (0..6).map(|s| acc.micro_step(s).g_allowed).collect();
        assert_eq!(allowed, [false, false, false, false, true, true]);

        let acc = Accumulation::new(nz(4), nz(2));
        assert!((0..8).all(|s| acc.micro_step(s).g_allowed));
    }

    #[test]
    fn every_window_closes_once_per_span() {
        for (wg, wd) in [(1, 1), (2, 2), (1, 3), (4, 2), (2, 6)] {
            let acc = Accumulation::new(nz(wg), nz(wd));
            let span = acc.span();
            let steps: Vec<MicroStep> = (0..span * 5).map(|s| acc.micro_step(s)).collect();

            for gradient_step in 0..5 {
                let in_span = steps.iter().filter(|m| m.gradient_step == gradient_step);
                let d_closes = in_span.clone().filter(|m| m.last_d).count();
                let g_closes = in_span.filter(|m| m.last_g && m.g_allowed).count();

                assert_eq!(d_closes, span / wd, "wg={wg} wd={wd}");
                assert_eq!(g_closes, 1, "wg={wg} wd={wd}");
            }
        }
    }

    #[test]
    fn a_window_joined_halfway_is_skipped() {
        let mut state = WindowState::default();
        assert!(!state.enter(false));
        assert!(state.enter(true));
        assert!(state.enter(false));
        state.close();
        assert!(!state.enter(false));
    }
}
