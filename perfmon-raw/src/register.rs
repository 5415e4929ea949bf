//! Generic register abstractions for type-safe PMU programming

/// Trait for register layouts that can be converted to/from raw register values
///
/// All PMU system registers visible from AArch32 are 32 bits wide, so layouts
/// convert to and from `u32`.
///
/// # Example
///
/// ```
/// use perfmon_raw::register::RegisterLayout;
///
/// #[derive(Debug, Default)]
/// struct UserEnable {
///     enable: bool,
///     software_increment: bool,
/// }
///
/// impl RegisterLayout for UserEnable {
///     fn to_raw(&self) -> u32 {
///         (self.enable as u32) | ((self.software_increment as u32) << 1)
///     }
///
///     fn from_raw(value: u32) -> Self {
///         Self {
///             enable: (value & 1) != 0,
///             software_increment: (value & 2) != 0,
///         }
///     }
/// }
///
/// assert_eq!(UserEnable { enable: true, software_increment: true }.to_raw(), 3);
/// ```
pub trait RegisterLayout: Sized {
    /// Convert this register layout to a raw register value
    fn to_raw(&self) -> u32;

    /// Parse a raw register value into this register layout
    fn from_raw(value: u32) -> Self;

    /// Validate that the register values are within acceptable ranges
    ///
    /// Returns `Ok(())` if valid, or an error message if invalid.
    fn validate(&self) -> Result<(), &'static str> {
        Ok(())
    }
}
