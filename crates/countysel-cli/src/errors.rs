use console::style;
use countysel_core::SelectorError;
use std::fmt;
use std::io::ErrorKind;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref context) = self.context {
            write!(f, ": {}", context)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Map a selector failure to a user-facing error
pub fn from_selector(error: &SelectorError, context: String) -> CliError {
    match error {
        SelectorError::CrsMismatch { expected, found } => CliError::new("CRS mismatch")
            .with_context(format!("Expected {}, found {}.\n\n{}", expected, found, context))
            .with_suggestion("Pass --crs with the layer's working CRS")
            .with_suggestion("Or set working_crs in countysel.toml")
            .with_help("Run: countysel config"),
        SelectorError::UnprojectedCrs { crs } => CliError::new("Working CRS is not projected")
            .with_context(format!("{} measures in degrees, so distances cannot be buffered.", crs))
            .with_suggestion("Use a projected CRS such as --crs 5070 (NAD83 / Conus Albers)")
            .with_help("Run: countysel query --help"),
        SelectorError::UnknownCrs { epsg } => CliError::new(format!("Unknown CRS EPSG:{}", epsg))
            .with_context("The linear units of this CRS are not built in.")
            .with_suggestion("Declare them with crs_units in countysel.toml")
            .with_suggestion("Or set COUNTYSEL_CRS_UNITS=meters")
            .with_help("Run: countysel config"),
        SelectorError::InvalidGeometry { reason } => CliError::new("Invalid drawing")
            .with_context(reason.clone())
            .with_suggestion("Redraw the shape: lines need two points, areas need three")
            .with_help("Run: countysel query --help"),
        SelectorError::KeyFormat { key, reason } => {
            CliError::new(format!("Identifier '{}' cannot be used as a join key", key))
                .with_context(reason.clone())
                .with_suggestion("Check --key-field names the identifier column of the table")
                .with_suggestion("Or check --id-field names the identifier property of the layer")
                .with_help("Run: countysel inspect --help")
        }
        SelectorError::MissingColumn { column } => {
            CliError::new(format!("Column '{}' not found", column))
                .with_context(context)
                .with_suggestion("Column names are case-sensitive")
                .with_suggestion("Pass --key-field with the table's identifier column")
                .with_help("Run: countysel query --help")
        }
        SelectorError::FormatError { .. } => CliError::new(error.to_string())
            .with_context(context)
            .with_suggestion("Reference layers must be GeoJSON or Shapefile; tables must be CSV")
            .with_help("Run: countysel inspect --help"),
        SelectorError::ConfigInvalid { key, reason } => {
            CliError::new(format!("Invalid configuration: {}", key))
                .with_context(reason.clone())
                .with_suggestion("Check countysel.toml and COUNTYSEL_* environment variables")
                .with_help("Run: countysel config")
        }
        SelectorError::Io(io) => CliError::new("File not found or unreadable")
            .with_context(format!("{}\n\n{}", context, io))
            .with_suggestion("Check the file path and try again"),
        _ => CliError::new(context).with_context(error.to_string()),
    }
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    if let Some(selector) = error.chain().find_map(|e| e.downcast_ref::<SelectorError>()) {
        return from_selector(selector, error.to_string());
    }

    let io_kind = error
        .chain()
        .find_map(|e| e.downcast_ref::<std::io::Error>())
        .map(|e| e.kind());
    match io_kind {
        Some(ErrorKind::NotFound) => CliError::new("File not found")
            .with_context(format!("Error: {:#}", error))
            .with_suggestion("Check the file path and try again"),
        Some(ErrorKind::PermissionDenied) => CliError::new("Permission denied")
            .with_context(format!("Error: {:#}", error))
            .with_suggestion("Check file permissions"),
        _ => CliError::new(format!("{:#}", error)),
    }
}
