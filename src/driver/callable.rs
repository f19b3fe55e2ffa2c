//! Driver whose output comes from a plain function

use std::fmt;
use std::rc::Rc;

use crate::error::PartialError;

use super::{Partial, PartialDriver};

/// Render function wrapped by [`CallableDriver`]
pub type RenderFn = Rc<dyn Fn(&PartialDriver) -> String>;

/// One-off partial backed by a render function
#[derive(Clone)]
pub struct CallableDriver {
    driver: PartialDriver,
    render_fn: RenderFn,
}

impl CallableDriver {
    pub fn new(render: impl Fn(&PartialDriver) -> String + 'static) -> Self {
        Self::from_fn(Rc::new(render))
    }

    pub fn from_fn(render_fn: RenderFn) -> Self {
        Self {
            driver: PartialDriver::new(),
            render_fn,
        }
    }
}

impl fmt::Debug for CallableDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableDriver")
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

impl Partial for CallableDriver {
    fn driver(&self) -> &PartialDriver {
        &self.driver
    }

    fn driver_mut(&mut self) -> &mut PartialDriver {
        &mut self.driver
    }

    fn render(&mut self) -> Result<String, PartialError> {
        Ok((self.render_fn)(&self.driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_calls_function() {
        let mut driver =
            CallableDriver::new(|d| format!("<b>{}</b>", d.params().get_str("label").unwrap_or("")));
        driver.driver_mut().params_mut().set("label", "hi");
        assert_eq!(driver.render().unwrap(), "<b>hi</b>");
    }

    #[test]
    fn test_clones_share_render_function() {
        let driver = CallableDriver::new(|d| d.id().to_string());
        let mut copy = driver.clone();
        copy.driver_mut().set_id("copy");
        assert_eq!(copy.render().unwrap(), "copy");
    }
}
