//! Asynchronous file loading with per-frame event delivery.
//!
//! Requests are queued per channel and processed by one I/O thread per
//! channel. Each channel has a fixed number of lanes, and each lane owns one
//! staging buffer allocated up front and reused for every request the lane
//! handles, so a channel never has more than `num_lanes` requests in flight.
//!
//! Nothing is delivered from the I/O threads directly: [`Fetcher::pump`] must
//! be called (once per frame) from the owning thread, and all events are
//! handed to its callback there. For every request the events arrive as
//! [`FetchEvent::Dispatched`], then at most one [`FetchEvent::Fetched`], then
//! exactly one [`FetchEvent::Finished`].

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("{path} is {size} bytes, which does not fit the {capacity} byte staging buffer")]
    BufferTooSmall {
        path: PathBuf,
        size: u64,
        capacity: usize,
    },
    #[error("reading {path} failed: {message}")]
    Io { path: PathBuf, message: String },
    #[error("the fetch queue is full ({0} requests)")]
    QueueFull(usize),
    #[error("no such fetch channel: {0}")]
    InvalidChannel(usize),
    #[error("the I/O thread of channel {0} is gone")]
    ChannelClosed(usize),
}

/// Where request paths are read from. Implementations are shared between the
/// I/O threads of all channels.
pub trait Source: Send + Sync + 'static {
    /// Reads the whole file at `path` into the front of `buffer` and returns
    /// the number of bytes read. Files longer than `buffer` must fail with
    /// [`FetchError::BufferTooSmall`] without reading.
    fn read(&self, path: &Path, buffer: &mut [u8]) -> Result<usize, FetchError>;
}

/// Reads files relative to a root directory.
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> FsSource {
        FsSource { root: root.into() }
    }
}

impl Source for FsSource {
    fn read(&self, path: &Path, buffer: &mut [u8]) -> Result<usize, FetchError> {
        let full_path = self.root.join(path);
        let io_error = |err: io::Error| match err.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(full_path.clone()),
            _ => FetchError::Io {
                path: full_path.clone(),
                message: err.to_string(),
            },
        };
        let mut file = File::open(&full_path).map_err(io_error)?;
        let size = file.metadata().map_err(io_error)?.len();
        if size > buffer.len() as u64 {
            return Err(FetchError::BufferTooSmall {
                path: full_path.clone(),
                size,
                capacity: buffer.len(),
            });
        }
        let size = size as usize;
        file.read_exact(&mut buffer[..size]).map_err(io_error)?;
        Ok(size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchDesc {
    /// Upper bound of queued plus in-flight requests over all channels.
    pub max_requests: usize,
    pub num_channels: usize,
    pub num_lanes: usize,
    /// Size of each lane's staging buffer in bytes.
    pub buffer_size: usize,
}

impl FetchDesc {
    /// The first setting that is zero, none of them may be.
    pub fn zero_field(&self) -> Option<&'static str> {
        [
            ("max_requests", self.max_requests),
            ("num_channels", self.num_channels),
            ("num_lanes", self.num_lanes),
            ("buffer_size", self.buffer_size),
        ]
        .into_iter()
        .find(|&(_, value)| value == 0)
        .map(|(name, _)| name)
    }
}

impl Default for FetchDesc {
    fn default() -> Self {
        FetchDesc {
            max_requests: 64,
            num_channels: 1,
            num_lanes: 4,
            buffer_size: 4 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FetchHandle(u32);

pub struct FetchRequest<T> {
    pub path: PathBuf,
    pub channel: usize,
    pub user_data: T,
}

#[derive(Debug, PartialEq, Eq)]
pub enum FetchEvent<'a> {
    /// The request was assigned to a lane and its I/O has started.
    Dispatched,
    /// The complete file contents, borrowed from the lane's staging buffer.
    Fetched(&'a [u8]),
    /// The request is done. Always the last event of a request.
    Finished(Result<(), FetchError>),
}

pub struct FetchResponse<'a, T> {
    pub handle: FetchHandle,
    pub channel: usize,
    pub lane: usize,
    pub path: &'a Path,
    pub user_data: &'a T,
    pub event: FetchEvent<'a>,
}

struct Pending<T> {
    handle: FetchHandle,
    path: PathBuf,
    user_data: T,
}

struct Lane<T> {
    /// `None` while the buffer is lent to the I/O thread.
    buffer: Option<Vec<u8>>,
    active: Option<Pending<T>>,
}

struct Job {
    lane: usize,
    path: PathBuf,
    buffer: Vec<u8>,
}

struct Completion {
    lane: usize,
    buffer: Vec<u8>,
    result: Result<usize, FetchError>,
}

struct Channel<T> {
    queue: VecDeque<Pending<T>>,
    lanes: Vec<Lane<T>>,
    job_sender: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    thread: Option<JoinHandle<()>>,
}

impl<T> Channel<T> {
    fn new(index: usize, desc: &FetchDesc, source: Arc<dyn Source>) -> io::Result<Channel<T>> {
        let (job_sender, jobs) = crossbeam_channel::unbounded::<Job>();
        let (completion_sender, completions) = crossbeam_channel::unbounded::<Completion>();
        let thread = thread::Builder::new()
            .name(format!("fetch-channel-{index}"))
            .spawn(move || {
                while let Ok(mut job) = jobs.recv() {
                    let result = source.read(&job.path, &mut job.buffer);
                    let completion = Completion {
                        lane: job.lane,
                        buffer: job.buffer,
                        result,
                    };
                    if completion_sender.send(completion).is_err() {
                        break;
                    }
                }
            })?;
        let lanes = (0..desc.num_lanes)
            .map(|_| Lane {
                buffer: Some(vec![0; desc.buffer_size]),
                active: None,
            })
            .collect();
        Ok(Channel {
            queue: VecDeque::new(),
            lanes,
            job_sender: Some(job_sender),
            completions,
            thread: Some(thread),
        })
    }

    fn in_flight(&self) -> usize {
        self.lanes.iter().filter(|lane| lane.active.is_some()).count()
    }
}

pub struct Fetcher<T> {
    desc: FetchDesc,
    channels: Vec<Channel<T>>,
    next_handle: u32,
}

impl<T> Fetcher<T> {
    /// Allocates the lane buffers and starts one I/O thread per channel.
    pub fn new(desc: FetchDesc, source: Arc<dyn Source>) -> io::Result<Fetcher<T>> {
        if let Some(field) = desc.zero_field() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("fetch: {field} must be at least 1"),
            ));
        }
        let channels = (0..desc.num_channels)
            .map(|index| Channel::new(index, &desc, source.clone()))
            .collect::<io::Result<Vec<_>>>()?;
        debug!(
            "fetch: {} channel(s) x {} lane(s), {} byte buffers",
            desc.num_channels,
            desc.num_lanes,
            desc.buffer_size,
        );
        Ok(Fetcher {
            desc,
            channels,
            next_handle: 1,
        })
    }

    /// Queues a request. Never blocks; the request is dispatched by a later
    /// [`Fetcher::pump`].
    pub fn send(&mut self, request: FetchRequest<T>) -> Result<FetchHandle, FetchError> {
        if self.pending() >= self.desc.max_requests {
            return Err(FetchError::QueueFull(self.desc.max_requests));
        }
        let Some(channel) = self.channels.get_mut(request.channel) else {
            return Err(FetchError::InvalidChannel(request.channel));
        };
        let handle = FetchHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        channel.queue.push_back(Pending {
            handle,
            path: request.path,
            user_data: request.user_data,
        });
        Ok(handle)
    }

    /// Number of requests that have not finished yet.
    pub fn pending(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.queue.len() + channel.in_flight())
            .sum()
    }

    /// Delivers the events of completed requests, then dispatches queued
    /// requests to free lanes. Does not block.
    pub fn pump<F>(&mut self, mut callback: F)
    where
        F: FnMut(FetchResponse<'_, T>),
    {
        for (channel_index, channel) in self.channels.iter_mut().enumerate() {
            while let Ok(completion) = channel.completions.try_recv() {
                let lane_index = completion.lane;
                let lane = &mut channel.lanes[lane_index];
                lane.buffer = Some(completion.buffer);
                let Some(request) = lane.active.take() else {
                    continue;
                };
                let buffer = lane.buffer.as_deref().unwrap_or_default();
                let mut respond = |event| {
                    callback(FetchResponse {
                        handle: request.handle,
                        channel: channel_index,
                        lane: lane_index,
                        path: &request.path,
                        user_data: &request.user_data,
                        event,
                    })
                };
                match completion.result {
                    Ok(len) => {
                        debug!("fetch: {} ({len} bytes)", request.path.display());
                        respond(FetchEvent::Fetched(&buffer[..len]));
                        respond(FetchEvent::Finished(Ok(())));
                    }
                    Err(err) => {
                        debug!("fetch: {} failed: {err}", request.path.display());
                        respond(FetchEvent::Finished(Err(err)));
                    }
                }
            }

            for lane_index in 0..channel.lanes.len() {
                let lane = &mut channel.lanes[lane_index];
                if lane.active.is_some() || lane.buffer.is_none() {
                    continue;
                }
                let Some(request) = channel.queue.pop_front() else {
                    break;
                };
                callback(FetchResponse {
                    handle: request.handle,
                    channel: channel_index,
                    lane: lane_index,
                    path: &request.path,
                    user_data: &request.user_data,
                    event: FetchEvent::Dispatched,
                });
                let job = Job {
                    lane: lane_index,
                    path: request.path.clone(),
                    buffer: lane.buffer.take().unwrap_or_default(),
                };
                let sent = match &channel.job_sender {
                    Some(sender) => sender.send(job).map_err(|err| err.into_inner()),
                    None => Err(job),
                };
                match sent {
                    Ok(()) => lane.active = Some(request),
                    Err(job) => {
                        // The I/O thread is gone; take the buffer back and
                        // fail the request right away.
                        lane.buffer = Some(job.buffer);
                        callback(FetchResponse {
                            handle: request.handle,
                            channel: channel_index,
                            lane: lane_index,
                            path: &request.path,
                            user_data: &request.user_data,
                            event: FetchEvent::Finished(Err(FetchError::ChannelClosed(
                                channel_index,
                            ))),
                        });
                    }
                }
            }
        }
    }
}

impl<T> Drop for Fetcher<T> {
    fn drop(&mut self) {
        for channel in &mut self.channels {
            // Closing the job channel ends the I/O thread's loop.
            channel.job_sender = None;
            if let Some(thread) = channel.thread.take() {
                if thread.join().is_err() {
                    error!("fetch: an I/O thread panicked");
                }
            }
        }
    }
}
