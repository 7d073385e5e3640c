//! Sandbox image catalog maintenance.

use crate::app::AppContext;
use crate::domain::AppError;
use crate::ports::resources::{NewSandboxImage, Pk, SandboxImage, SandboxImagePatch};
use crate::ports::{AutograderApi, ImageScope};

/// Every global image, in the order the service returns them.
pub fn list<A: AutograderApi>(ctx: &AppContext<A>) -> Result<Vec<SandboxImage>, AppError> {
    ctx.api().list_sandbox_images(ImageScope::Global)
}

pub fn show<A: AutograderApi>(ctx: &AppContext<A>, pk: Pk) -> Result<SandboxImage, AppError> {
    match ctx.api().get_sandbox_image(pk) {
        Err(AppError::RemoteRequest { status: 404, .. }) => {
            Err(AppError::NotFound(format!("Sandbox image {} not found", pk)))
        }
        other => other,
    }
}

pub fn create<A: AutograderApi>(
    ctx: &AppContext<A>,
    image: &NewSandboxImage,
) -> Result<SandboxImage, AppError> {
    let fields = [("name", &image.name), ("display name", &image.display_name), ("tag", &image.tag)];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(AppError::config_error(format!("Image {} must not be empty", field)));
        }
    }
    let created = ctx.api().create_sandbox_image(image)?;
    tracing::info!(pk = created.pk, name = %created.name, "created sandbox image");
    Ok(created)
}

/// Apply `patch` to an existing image. An empty patch is rejected before any request.
pub fn edit<A: AutograderApi>(
    ctx: &AppContext<A>,
    pk: Pk,
    patch: &SandboxImagePatch,
) -> Result<SandboxImage, AppError> {
    if patch.is_empty() {
        return Err(AppError::config_error("Nothing to edit. Pass --display-name or --tag."));
    }
    ctx.api().update_sandbox_image(pk, patch)
}
