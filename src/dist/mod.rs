//! Assembling build outputs into installable trees and archives.
//!
//! Files are grouped in [`FileBundle`]s under a [`Package`]. Every file ends
//! up at
//!
//! ```text
//! install_prefix/bundle_prefix/added_prefix/file_prefix/file_name
//! ```
//!
//! where empty components are skipped. A [`Packager`] stages the package
//! into a scratch tree and turns it into a distributable file.

mod bundle;
mod package;
mod packager;

pub use bundle::{compose_path, FileBundle, InstallableFile};
pub use package::Package;
pub use packager::{make_source_dist, Packager, RpmPackager, TarGzPackager};
