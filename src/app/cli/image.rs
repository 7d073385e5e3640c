//! Image subcommand implementations.

use crate::app::api::{self, NewSandboxImage, Pk, SandboxImage, SandboxImagePatch};
use crate::domain::{ApiConfig, AppError};

fn describe(image: &SandboxImage) -> String {
    format!(
        "{}: {}\n    display_name: {}\n    tag: {}",
        image.pk, image.name, image.display_name, image.tag
    )
}

pub fn run_list(api_config: &ApiConfig) -> Result<(), AppError> {
    for image in api::list_images(api_config)? {
        println!("{}", describe(&image));
    }
    Ok(())
}

pub fn run_show(api_config: &ApiConfig, pk: Pk) -> Result<(), AppError> {
    println!("{}", describe(&api::show_image(api_config, pk)?));
    Ok(())
}

pub fn run_create(api_config: &ApiConfig, body: &NewSandboxImage) -> Result<(), AppError> {
    let image = api::create_image(api_config, body)?;
    println!("✅ Created image\n{}", describe(&image));
    Ok(())
}

pub fn run_edit(
    api_config: &ApiConfig,
    pk: Pk,
    patch: &SandboxImagePatch,
) -> Result<(), AppError> {
    let image = api::edit_image(api_config, pk, patch)?;
    println!("✅ Updated image\n{}", describe(&image));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_name_and_tag() {
        let image = SandboxImage {
            pk: 4,
            name: "eecs280".to_string(),
            display_name: "EECS 280".to_string(),
            tag: "eecs280/sandbox:1".to_string(),
        };
        assert_eq!(
            describe(&image),
            "4: eecs280\n    display_name: EECS 280\n    tag: eecs280/sandbox:1"
        );
    }
}
