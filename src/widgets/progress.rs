//! Progress - a bounded value with an accessible progressbar role.
//!
//! Invalid input never panics:
//! - `max` that is not finite and positive warns and falls back to 100
//! - `value` outside `0..=max` (or not finite) warns and becomes
//!   indeterminate

use std::rc::Rc;

use spark_signals::{effect, effect_scope, signal, untrack, Signal};

use crate::error::Result;
use crate::primitives::context::{create_scoped_context_factory, CreateScope, Scope, ScopedContext};
use crate::primitives::{on_cleanup, owned, Children, Cleanup, ElementProps, NodeRef, PropValue, RenderAs};

const PROGRESS_NAME: &str = "Progress";
const INDICATOR_NAME: &str = "ProgressIndicator";

/// Fallback for an invalid `max`.
pub const DEFAULT_MAX: f64 = 100.0;

/// Formats the `aria-valuetext` of a determinate progress.
pub type ValueLabel = Rc<dyn Fn(f64, f64) -> String>;

/// Derived state exposed as `data-state`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressState {
    Indeterminate,
    Loading,
    Complete,
}

impl ProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressState::Indeterminate => "indeterminate",
            ProgressState::Loading => "loading",
            ProgressState::Complete => "complete",
        }
    }
}

/// State of a progress with value `value` out of `max`.
pub fn progress_state(value: Option<f64>, max: f64) -> ProgressState {
    match value {
        None => ProgressState::Indeterminate,
        Some(value) if value == max => ProgressState::Complete,
        Some(_) => ProgressState::Loading,
    }
}

fn is_valid_max(max: f64) -> bool {
    max.is_finite() && max > 0.0
}

fn is_valid_value(value: f64, max: f64) -> bool {
    value.is_finite() && (0.0..=max).contains(&value)
}

/// `max`, or [`DEFAULT_MAX`] with a warning.
pub fn validate_max(max: Option<f64>) -> f64 {
    match max {
        None => DEFAULT_MAX,
        Some(max) if is_valid_max(max) => max,
        Some(max) => {
            log::warn!(
                "Invalid prop `max` of value `{max}` supplied to `{PROGRESS_NAME}`. Only numbers \
                 greater than 0 are valid max values. Defaulting to `{DEFAULT_MAX}`."
            );
            DEFAULT_MAX
        }
    }
}

/// `value` if within `0..=max`, else `None` with a warning.
pub fn validate_value(value: Option<f64>, max: f64) -> Option<f64> {
    match value {
        Some(value) if !is_valid_value(value, max) => {
            log::warn!(
                "Invalid prop `value` of value `{value}` supplied to `{PROGRESS_NAME}`. The `value` \
                 prop must be a number between 0 and `max` ({max}) inclusive, or `None` for an \
                 indeterminate progress. Defaulting to `None`."
            );
            None
        }
        value => value,
    }
}

fn default_value_label(value: f64, max: f64) -> String {
    format!("{}%", (value / max * 100.0).round())
}

struct ProgressContext {
    value: Signal<Option<f64>>,
    max: Signal<f64>,
}

impl ProgressContext {
    fn state(&self) -> ProgressState {
        progress_state(self.value.get(), self.max.get())
    }

    fn data_attributes(self: &Rc<Self>, props: ElementProps) -> ElementProps {
        props
            .attr_with("data-state", {
                let ctx = self.clone();
                move || Some(ctx.state().as_str().to_string())
            })
            .attr_with("data-value", {
                let ctx = self.clone();
                move || ctx.value.get().map(|value| value.to_string())
            })
            .attr_with("data-max", {
                let ctx = self.clone();
                move || Some(ctx.max.get().to_string())
            })
    }
}

struct Family {
    context: ScopedContext<ProgressContext>,
    create_scope: CreateScope,
}

thread_local! {
    static FAMILY: Family = {
        let (factory, create_scope) = create_scoped_context_factory(PROGRESS_NAME, vec![]);
        Family {
            context: factory.create_context(PROGRESS_NAME, None),
            create_scope,
        }
    };
}

fn context() -> ScopedContext<ProgressContext> {
    FAMILY.with(|family| family.context.clone())
}

pub fn create_progress_scope() -> CreateScope {
    FAMILY.with(|family| family.create_scope.clone())
}

// =============================================================================
// Root
// =============================================================================

/// Properties for [`progress`].
#[derive(Default)]
pub struct ProgressProps {
    pub scope: Scope,
    /// `None` is indeterminate.
    pub value: PropValue<Option<f64>>,
    /// `None` means [`DEFAULT_MAX`].
    pub max: PropValue<Option<f64>>,
    pub get_value_label: Option<ValueLabel>,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

/// Mount a progress root.
pub fn progress(props: ProgressProps) -> Cleanup {
    let ProgressProps {
        scope,
        value,
        max,
        get_value_label,
        node_ref,
        render_as,
        children,
    } = props;

    let ctx = Rc::new(ProgressContext {
        value: signal(None),
        max: signal(DEFAULT_MAX),
    });

    // Validate once per input change so warnings are not repeated per read.
    let validation = effect_scope(false);
    validation.run({
        let ctx = ctx.clone();
        move || {
            let _stop = effect(move || {
                let max = validate_max(max.get());
                let value = validate_value(value.get(), max);
                untrack(|| {
                    ctx.max.set(max);
                    ctx.value.set(value);
                });
            });
        }
    });

    let label: ValueLabel = get_value_label.unwrap_or_else(|| Rc::new(default_value_label));
    let mut root = ElementProps::new("div")
        .attr("role", "progressbar")
        .attr("aria-valuemin", "0")
        .attr_with("aria-valuemax", {
            let ctx = ctx.clone();
            move || Some(ctx.max.get().to_string())
        })
        .attr_with("aria-valuenow", {
            let ctx = ctx.clone();
            move || ctx.value.get().map(|value| value.to_string())
        })
        .attr_with("aria-valuetext", {
            let ctx = ctx.clone();
            move || {
                let max = ctx.max.get();
                ctx.value.get().map(|value| label(value, max))
            }
        });
    root = ctx.data_attributes(root);
    if let Some(node_ref) = node_ref {
        root = root.node_ref(node_ref);
    }

    root.children = Some(Box::new(move || {
        on_cleanup(context().provide_rc(&scope, ctx, move || {
            if let Some(children) = children {
                children();
            }
        }));
    }));

    let rendered = render_as.render(root);
    owned(Box::new(move || {
        rendered();
        validation.stop();
    }))
}

// =============================================================================
// Indicator
// =============================================================================

/// Properties for [`progress_indicator`].
#[derive(Default)]
pub struct ProgressIndicatorProps {
    pub scope: Scope,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

/// Mount the indicator of the nearest progress.
pub fn progress_indicator(props: ProgressIndicatorProps) -> Result<Cleanup> {
    let ctx = context().use_context(INDICATOR_NAME, &props.scope)?;
    let mut indicator = ctx.data_attributes(ElementProps::new("div"));
    if let Some(node_ref) = props.node_ref {
        indicator = indicator.node_ref(node_ref);
    }
    indicator.children = props.children;
    Ok(props.render_as.render(indicator))
}

// =============================================================================
// TESTS
// =============================================================================
