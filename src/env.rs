use anyhow::Result;

/// Represents an episodic environment in which an agent can operate.
///
/// This is the minimal capability set a sub-environment must offer to be wrapped by a
/// [`MetaEnv`](crate::menv::MetaEnv): it can be reset, stepped and rendered. Errors are opaque to
/// the library and are handed back to the caller unchanged.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type Obs;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Additional information returned with every step
    type Info;

    /// Reset the environment to an initial state
    ///
    /// **Returns** the initial observation
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Update the environment in response to an action taken by an agent
    ///
    /// **Returns** the `(observation, reward, done, info)` tuple as a [`Step`]
    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Obs, Self::Info>>;

    /// Render the current state of the environment
    ///
    /// Environments that cannot render return `Ok(None)`.
    fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>> {
        let _ = mode;
        Ok(None)
    }
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    type Obs = E::Obs;
    type Action = E::Action;
    type Info = E::Info;

    fn reset(&mut self) -> Result<Self::Obs> {
        (**self).reset()
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Obs, Self::Info>> {
        (**self).step(action)
    }

    fn render(&mut self, mode: RenderMode) -> Result<Option<Frame>> {
        (**self).render(mode)
    }
}

/// The result of one environment step
#[derive(Debug, Clone, PartialEq)]
pub struct Step<O, I> {
    /// The observation after the action was applied
    pub obs: O,
    /// The reward received for the action
    pub reward: f64,
    /// Whether the episode has ended
    pub done: bool,
    /// Environment specific information
    pub info: I,
}

impl<O, I> Step<O, I> {
    pub fn new(obs: O, reward: f64, done: bool, info: I) -> Self {
        Self {
            obs,
            reward,
            done,
            info,
        }
    }
}

/// How an environment should be rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Human,
    RgbArray,
    Ansi,
}

/// A rendered frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Rgb {
        width: usize,
        height: usize,
        pixels: Vec<u8>,
    },
}

/// Describes the observations or actions of an environment
#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    /// `n` possible values `0..n`
    Discrete(usize),
    /// A real-valued array of the given shape
    Box { shape: Vec<usize> },
}

impl Space {
    /// Number of scalar entries needed to represent one element of the space
    pub fn size(&self) -> usize {
        match self {
            Self::Discrete(n) => *n,
            Self::Box { shape } => shape.iter().product(),
        }
    }
}

/// Environments that can describe their observation and action spaces
pub trait Spaces {
    fn observation_space(&self) -> Space;
    fn action_space(&self) -> Space;
}
