//! Operations, their cascades, and the request messages that carry them.

use crate::device::DataSet;
use crate::error::{Result, SimFitError};
use crate::worker::queue::Prioritized;
use std::fmt;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, SyncSender};

/// The kinds of work the device worker performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Render,
    Resize,
    SetScale,
    Present,
    AnimationFrame,
    StartAnimation,
    StopAnimation,
    SetTime,
    LoadData,
    ReplaceData,
    RemoveData,
    ComputeChi,
    ComputeChi2r,
    ComputeLogLike,
    ComputeFlux,
    CopyImage,
    SaveImage,
    SetFreeParameters,
    Evaluate,
    Stop,
}

/// One unit of device work executed as part of an operation's cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Reallocate render targets for the current size
    Reconfigure,
    /// Advance the model time by one time step
    AdvanceTime,
    Render,
    Present,
}

impl Operation {
    /// Device steps run after the operation's own work.
    ///
    /// ```
    /// use simfit_rs::worker::{Operation, Step};
    ///
    /// assert_eq!(
    ///     Operation::Resize.steps(),
    ///     &[Step::Reconfigure, Step::Render, Step::Present]
    /// );
    /// assert!(Operation::ComputeChi.steps().is_empty());
    /// ```
    pub fn steps(self) -> &'static [Step] {
        match self {
            Operation::Resize | Operation::SetScale => {
                &[Step::Reconfigure, Step::Render, Step::Present]
            }
            Operation::Render | Operation::SetTime | Operation::SetFreeParameters => {
                &[Step::Render, Step::Present]
            }
            Operation::Present => &[Step::Present],
            Operation::AnimationFrame => &[Step::AdvanceTime, Step::Render, Step::Present],
            // Presenting is left to whoever asks for a frame
            Operation::Evaluate => &[Step::Render],
            _ => &[],
        }
    }

    pub fn is_stop(self) -> bool {
        self == Operation::Stop
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where a data set comes from
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A text file parsed on the worker thread
    File(PathBuf),
    /// An already parsed data set
    Data(DataSet),
}

/// Sending half of a one-shot reply slot
pub(crate) type Reply<T> = SyncSender<Result<T>>;

/// Create a one-shot reply slot.
pub(crate) fn reply_slot<T>() -> (Reply<T>, Receiver<Result<T>>) {
    mpsc::sync_channel(1)
}

/// Block on a reply slot; a slot dropped without an answer means the worker
/// went away.
pub(crate) fn wait_for<T>(slot: Receiver<Result<T>>) -> Result<T> {
    slot.recv().map_err(|_| SimFitError::WorkerStopped)?
}

/// A queued operation together with its payload and, for blocking calls,
/// the slot its result is returned through
pub enum Request {
    Render {
        reply: Option<Reply<()>>,
    },
    Resize {
        width: u32,
        height: u32,
        reply: Option<Reply<()>>,
    },
    /// Change the pixel scale (mas per pixel), then reconfigure and render
    SetScale {
        scale: f64,
        reply: Option<Reply<()>>,
    },
    Present,
    AnimationFrame,
    StartAnimation,
    StopAnimation,
    SetTime {
        time: f64,
        reply: Option<Reply<()>>,
    },
    LoadData {
        source: DataSource,
        reply: Reply<usize>,
    },
    ReplaceData {
        data_set: usize,
        source: DataSource,
        reply: Reply<()>,
    },
    RemoveData {
        data_set: usize,
        reply: Reply<()>,
    },
    /// Residuals of one data set, or of all data sets concatenated
    ComputeChi {
        data_set: Option<usize>,
        reply: Reply<Vec<f64>>,
    },
    /// Chi squared per degree of freedom of one data set, or of all of them
    ComputeChi2r {
        data_set: Option<usize>,
        reply: Reply<f64>,
    },
    /// Log-likelihood of one data set, or the sum over all data sets
    ComputeLogLike {
        data_set: Option<usize>,
        reply: Reply<f64>,
    },
    /// Sum of the pixel values of the last rendered frame
    ComputeFlux {
        reply: Reply<f64>,
    },
    CopyImage {
        width: u32,
        height: u32,
        depth: u32,
        reply: Reply<Vec<f32>>,
    },
    /// Write the first layer of the last rendered frame to a text file
    SaveImage {
        path: PathBuf,
        reply: Reply<()>,
    },
    SetFreeParameters {
        values: Vec<f64>,
        normalized: bool,
        reply: Reply<usize>,
    },
    /// Apply a trial vector (if any), render, and return chi squared per
    /// degree of freedom over all data sets
    Evaluate {
        values: Option<Vec<f64>>,
        normalized: bool,
        reply: Reply<f64>,
    },
    Stop,
}

impl Request {
    /// The operation tag of this request.
    pub fn operation(&self) -> Operation {
        match self {
            Request::Render { .. } => Operation::Render,
            Request::Resize { .. } => Operation::Resize,
            Request::SetScale { .. } => Operation::SetScale,
            Request::Present => Operation::Present,
            Request::AnimationFrame => Operation::AnimationFrame,
            Request::StartAnimation => Operation::StartAnimation,
            Request::StopAnimation => Operation::StopAnimation,
            Request::SetTime { .. } => Operation::SetTime,
            Request::LoadData { .. } => Operation::LoadData,
            Request::ReplaceData { .. } => Operation::ReplaceData,
            Request::RemoveData { .. } => Operation::RemoveData,
            Request::ComputeChi { .. } => Operation::ComputeChi,
            Request::ComputeChi2r { .. } => Operation::ComputeChi2r,
            Request::ComputeLogLike { .. } => Operation::ComputeLogLike,
            Request::ComputeFlux { .. } => Operation::ComputeFlux,
            Request::CopyImage { .. } => Operation::CopyImage,
            Request::SaveImage { .. } => Operation::SaveImage,
            Request::SetFreeParameters { .. } => Operation::SetFreeParameters,
            Request::Evaluate { .. } => Operation::Evaluate,
            Request::Stop => Operation::Stop,
        }
    }

    /// Build the fire-and-forget request for an operation tag.
    ///
    /// Operations that need a payload have no such form.
    pub fn from_operation(operation: Operation) -> Option<Self> {
        match operation {
            Operation::Render => Some(Request::Render { reply: None }),
            Operation::Present => Some(Request::Present),
            Operation::AnimationFrame => Some(Request::AnimationFrame),
            Operation::StartAnimation => Some(Request::StartAnimation),
            Operation::StopAnimation => Some(Request::StopAnimation),
            Operation::Stop => Some(Request::Stop),
            _ => None,
        }
    }

    /// True if a caller is blocked waiting for this request.
    pub fn has_waiter(&self) -> bool {
        match self {
            Request::Render { reply }
            | Request::Resize { reply, .. }
            | Request::SetScale { reply, .. }
            | Request::SetTime { reply, .. } => reply.is_some(),
            Request::Present
            | Request::AnimationFrame
            | Request::StartAnimation
            | Request::StopAnimation
            | Request::Stop => false,
            _ => true,
        }
    }

    /// Answer the waiting caller, if any, with an error.
    pub(crate) fn fail(self, err: SimFitError) {
        match self {
            Request::Render { reply }
            | Request::Resize { reply, .. }
            | Request::SetScale { reply, .. }
            | Request::SetTime { reply, .. } => {
                if let Some(reply) = reply {
                    let _ = reply.send(Err(err));
                }
            }
            Request::LoadData { reply, .. } | Request::SetFreeParameters { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::ReplaceData { reply, .. }
            | Request::RemoveData { reply, .. }
            | Request::SaveImage { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::ComputeChi { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::ComputeChi2r { reply, .. }
            | Request::ComputeLogLike { reply, .. }
            | Request::ComputeFlux { reply }
            | Request::Evaluate { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::CopyImage { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Request::Present
            | Request::AnimationFrame
            | Request::StartAnimation
            | Request::StopAnimation
            | Request::Stop => {}
        }
    }
}

impl Prioritized for Request {
    fn is_stop(&self) -> bool {
        self.operation().is_stop()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("operation", &self.operation())
            .field("has_waiter", &self.has_waiter())
            .finish()
    }
}
