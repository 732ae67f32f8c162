use anyhow::{ensure, Result};
use rand::{seq::SliceRandom, Rng};
use strum::{EnumIter, FromRepr, VariantArray};

use crate::{
    env::{Environment, Frame, RenderMode, Space, Spaces, Step},
    preprocess::{Image, Obs},
};

/// Number of cells seen by the agent, centered on itself
pub const VIEW: usize = 7;

const MISSION: &str = "walk right to the end of the corridor";

#[derive(EnumIter, VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Left = 0,
    Right = 1,
}

impl Move {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::VARIANTS.choose(rng).unwrap_or(&Self::Right)
    }
}

/// A one-dimensional corridor with the goal at its right end
///
/// The agent starts at the left end. Reaching the goal ends the episode with a reward of
/// `1 - 0.9 * steps / max_steps`; running out of steps ends it with 0. Longer corridors are
/// harder tasks, which makes a list of corridors a simple curriculum.
///
/// Observations are a `1 x VIEW x 3` image centered on the agent, one channel each for the
/// agent, the goal and the walls, and the mission text.
#[derive(Debug, Clone)]
pub struct Corridor {
    length: usize,
    max_steps: usize,
    pos: usize,
    steps: usize,
    done: bool,
}

impl Corridor {
    /// **Panics** if `length < 2` or `max_steps == 0`
    pub fn new(length: usize, max_steps: usize) -> Self {
        assert!(length >= 2, "A corridor needs at least two cells.");
        assert!(max_steps > 0, "At least one step is required.");
        Self {
            length,
            max_steps,
            pos: 0,
            steps: 0,
            done: false,
        }
    }

    /// A short name, used as a column name in training logs
    pub fn name(&self) -> String {
        format!("Corridor-{}", self.length)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn observe(&self) -> Obs {
        let mut image = Image::zeros([1, VIEW, 3]);
        let half = VIEW / 2;
        for col in 0..VIEW {
            let cell = (self.pos + col).checked_sub(half);
            let channel = match cell {
                Some(cell) if cell == self.pos => 0,
                Some(cell) if cell == self.length - 1 => 1,
                Some(cell) if cell < self.length => continue,
                _ => 2,
            };
            image.data[col * 3 + channel] = 1.0;
        }
        Obs {
            image,
            mission: String::from(MISSION),
        }
    }
}

impl Environment for Corridor {
    type Obs = Obs;
    type Action = Move;
    /// Position of the agent
    type Info = usize;

    fn reset(&mut self) -> Result<Self::Obs> {
        self.pos = 0;
        self.steps = 0;
        self.done = false;
        Ok(self.observe())
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Obs, Self::Info>> {
        ensure!(!self.done, "episode is over, the corridor must be reset");
        self.pos = match action {
            Move::Left => self.pos.saturating_sub(1),
            Move::Right => (self.pos + 1).min(self.length - 1),
        };
        self.steps += 1;

        let reached = self.pos == self.length - 1;
        let reward = if reached {
            1.0 - 0.9 * self.steps as f64 / self.max_steps as f64
        } else {
            0.0
        };
        self.done = reached || self.steps >= self.max_steps;

        Ok(Step::new(self.observe(), reward, self.done, self.pos))
    }

    fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>> {
        let text = (0..self.length)
            .map(|cell| match cell {
                c if c == self.pos => 'A',
                c if c == self.length - 1 => 'G',
                _ => '.',
            })
            .collect::<String>();
        match mode {
            RenderMode::Human => {
                println!("{text}");
                Ok(None)
            }
            RenderMode::Ansi => Ok(Some(Frame::Text(text))),
            RenderMode::RgbArray => {
                let pixels = text
                    .chars()
                    .flat_map(|c| match c {
                        'A' => [255, 0, 0],
                        'G' => [0, 255, 0],
                        _ => [0, 0, 0],
                    })
                    .collect();
                Ok(Some(Frame::Rgb {
                    width: self.length,
                    height: 1,
                    pixels,
                }))
            }
        }
    }
}

impl Spaces for Corridor {
    fn observation_space(&self) -> Space {
        Space::Box {
            shape: vec![1, VIEW, 3],
        }
    }

    fn action_space(&self) -> Space {
        Space::Discrete(Move::VARIANTS.len())
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn corridor_functional() {
        let mut env = Corridor::new(3, 10);
        let obs = env.reset().unwrap();
        assert_eq!(obs.image.shape, [1, VIEW, 3]);
        assert_eq!(obs.mission, MISSION);

        let step = env.step(Move::Left).unwrap();
        assert_eq!(step.info, 0, "left wall blocks");
        assert!(!step.done);

        env.step(Move::Right).unwrap();
        let step = env.step(Move::Right).unwrap();
        assert!(step.done, "goal reached");
        assert!((step.reward - 0.73).abs() < 1e-12, "penalized by 3 of 10 steps");
        assert!(env.step(Move::Right).is_err(), "stepping a finished episode");

        env.reset().unwrap();
        assert_eq!(env.position(), 0, "back at the start");
    }

    #[test]
    fn step_limit_ends_episode() {
        let mut env = Corridor::new(5, 2);
        env.reset().unwrap();
        env.step(Move::Right).unwrap();
        let step = env.step(Move::Left).unwrap();
        assert!(step.done, "out of steps");
        assert_eq!(step.reward, 0.0);
    }

    #[test]
    fn observation_view() {
        let mut env = Corridor::new(3, 10);
        let obs = env.reset().unwrap();
        let channel = |c: usize| {
            (0..VIEW)
                .map(|col| obs.image.data[col * 3 + c])
                .collect::<Vec<_>>()
        };
        assert_eq!(channel(0), [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], "agent centered");
        assert_eq!(channel(1), [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0], "goal two cells right");
        assert_eq!(channel(2), [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0], "walls beyond the ends");
    }

    #[test]
    fn render_modes() {
        let mut env = Corridor::new(4, 10);
        env.reset().unwrap();
        env.step(Move::Right).unwrap();
        assert_eq!(
            env.render(RenderMode::Ansi).unwrap(),
            Some(Frame::Text(String::from(".A.G")))
        );
        match env.render(RenderMode::RgbArray).unwrap() {
            Some(Frame::Rgb { width, pixels, .. }) => {
                assert_eq!(width, 4);
                assert_eq!(&pixels[3..6], [255, 0, 0], "agent pixel");
            }
            frame => panic!("unexpected frame {frame:?}"),
        }
    }

    #[test]
    fn spaces_and_actions() {
        let env = Corridor::new(4, 10);
        assert_eq!(env.action_space(), Space::Discrete(2));
        assert_eq!(env.observation_space().size(), VIEW * 3);
        assert_eq!(Move::iter().collect::<Vec<_>>(), [Move::Left, Move::Right]);
        assert_eq!(Move::from_repr(1), Some(Move::Right));

        let mut rng = StdRng::seed_from_u64(0);
        assert!(Move::VARIANTS.contains(&Move::random(&mut rng)));
    }
}
