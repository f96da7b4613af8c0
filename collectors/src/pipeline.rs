use herald::{Collect, Event, Result};
use std::fmt;
use std::sync::Arc;

type FilterFn = dyn Fn(&Event) -> bool + Send + Sync;
type TransformFn = dyn Fn(Event) -> Event + Send + Sync;

enum Stage {
  Filter(Box<FilterFn>),
  Transform(Box<TransformFn>),
}

/// An immutable chain of event filters and transforms that can sit in front
/// of any collector.
///
/// Builder methods take `&self` and return extended copies, so a pipeline
/// can branch mid-build and be attached to several collectors; the attached
/// copies share their common stages.
///
/// ```
/// use herald::Level;
/// use herald_collectors::Pipeline;
///
/// let base = Pipeline::new().filter(|event| event.level <= Level::Warn);
/// let tagged = base.transform(|mut event| {
///   event.context = event.context.with_value("alerted", true);
///   event
/// });
/// # let _ = (base, tagged);
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
  stages: Vec<Arc<Stage>>,
}

impl Pipeline {
  pub fn new() -> Pipeline {
    Pipeline { stages: Vec::new() }
  }

  /// Returns an extended pipeline that passes on only events for which
  /// `keep` returns true.  Filtered-out events are reported as delivered.
  pub fn filter(&self, keep: impl Fn(&Event) -> bool + Send + Sync + 'static) -> Pipeline {
    self.with_stage(Stage::Filter(Box::new(keep)))
  }

  /// Returns an extended pipeline that replaces each event with
  /// `apply(event)` before passing it on.
  pub fn transform(&self, apply: impl Fn(Event) -> Event + Send + Sync + 'static) -> Pipeline {
    self.with_stage(Stage::Transform(Box::new(apply)))
  }

  fn with_stage(&self, stage: Stage) -> Pipeline {
    let mut stages = self.stages.clone();
    stages.push(Arc::new(stage));
    Pipeline { stages }
  }

  /// Wraps `collector` so it only sees events that passed the pipeline.
  pub fn attach(&self, collector: Arc<dyn Collect>) -> PipelineCollector {
    PipelineCollector {
      pipeline: self.clone(),
      collector,
    }
  }

  fn apply(&self, event: &Arc<Event>) -> Option<Arc<Event>> {
    let mut current = Arc::clone(event);
    for stage in &self.stages {
      match stage.as_ref() {
        Stage::Filter(keep) => {
          if !keep(&current) {
            return None;
          }
        }
        Stage::Transform(apply) => {
          current = Arc::new(apply((*current).clone()));
        }
      }
    }
    Some(current)
  }
}

/// A collector with a [`Pipeline`] in front of it.
pub struct PipelineCollector {
  pipeline: Pipeline,
  collector: Arc<dyn Collect>,
}

impl fmt::Display for PipelineCollector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Pipeline(target={})", self.collector)
  }
}

impl Collect for PipelineCollector {
  fn collect(&self, event: &Arc<Event>) -> Result<()> {
    match self.pipeline.apply(event) {
      Some(event) => self.collector.collect(&event),
      None => Ok(()),
    }
  }

  fn close(&self) -> Result<()> {
    self.collector.close()
  }
}
