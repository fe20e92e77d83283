//! Application state (Model in TEA pattern)

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use boardlink_core::{
    DetectedDevice, Fqbn, IotDevice, IotDevicesGroups, SelectionState, SketchMetadata,
};
use boardlink_feeds::BoardCatalog;

use crate::alt_port::PortOverlay;
use crate::config::Settings;
use crate::prompt_gate::PromptGate;

/// How the current port was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    Auto,
    Manual,
}

/// Identifier of a generic bypass window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BypassId(pub u64);

impl fmt::Display for BypassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bypass-{}", self.0)
    }
}

/// What ends a bypass window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BypassKind {
    /// Host-opened; ends on the next detected-devices tick
    Generic,
    /// Opened when a detach cleared the sketch association; ends when the
    /// metadata moves away from this fqbn
    MetadataCleared { fqbn: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bypass {
    pub id: BypassId,
    pub kind: BypassKind,
}

/// Where the host currently is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteContext {
    pub sketch_id: Option<String>,
    /// Example sketches are selectable before their metadata loads
    pub example: bool,
    /// Auto-selection is off while a copy of the sketch is being created
    pub creating_copy: bool,
}

/// Latest value of every external input
#[derive(Debug, Clone, Default)]
pub struct FeedInputs {
    pub ports: Vec<DetectedDevice>,
    pub iot: IotDevicesGroups,
    /// `None` while loading
    pub metadata: Option<SketchMetadata>,
    pub busy: BTreeSet<String>,
}

/// Upload lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadPhase {
    #[default]
    Idle,
    Uploading,
    /// Finished, waiting out the grace period
    Settling,
}

/// Complete application state
pub struct AppState {
    /// What the host renders
    pub selection: SelectionState,

    pub inputs: FeedInputs,
    pub route: RouteContext,
    pub settings: Settings,

    /// Base fqbn of the selected board
    pub(crate) board_fqbn: Option<String>,
    /// `menu=variant` pairs carried by the fqbn the board was chosen with
    pub(crate) flavour_hints: Vec<(String, String)>,
    /// Base the current flavour options were seeded for
    pub(crate) flavour_base: Option<String>,

    pub(crate) origin: Option<SelectionOrigin>,
    /// Endpoint ids seen on the previous evaluation; `None` before the first
    pub(crate) known_ids: Option<BTreeSet<String>>,
    pub(crate) bypasses: Vec<Bypass>,
    next_bypass_id: u64,
    pub(crate) user_switched_alt: bool,
    /// Identities borrowed from IoT devices, keyed by port board id
    pub(crate) overlays: HashMap<String, PortOverlay>,
    pub(crate) upload: UploadPhase,
    /// Bumped on every finished upload so stale settle timers are ignored
    pub(crate) upload_generation: u64,
    pub(crate) prompt_gate: PromptGate,

    catalog: Arc<dyn BoardCatalog>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("selection", &self.selection)
            .field("route", &self.route)
            .field("board_fqbn", &self.board_fqbn)
            .field("origin", &self.origin)
            .field("bypasses", &self.bypasses)
            .field("upload", &self.upload)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(catalog: Arc<dyn BoardCatalog>) -> Self {
        Self::with_settings(Settings::default(), catalog)
    }

    pub fn with_settings(settings: Settings, catalog: Arc<dyn BoardCatalog>) -> Self {
        Self {
            selection: SelectionState::default(),
            inputs: FeedInputs::default(),
            route: RouteContext::default(),
            settings,
            board_fqbn: None,
            flavour_hints: Vec::new(),
            flavour_base: None,
            origin: None,
            known_ids: None,
            bypasses: Vec::new(),
            next_bypass_id: 1,
            user_switched_alt: false,
            overlays: HashMap::new(),
            upload: UploadPhase::Idle,
            upload_generation: 0,
            prompt_gate: PromptGate::new(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &dyn BoardCatalog {
        self.catalog.as_ref()
    }

    pub fn origin(&self) -> Option<SelectionOrigin> {
        self.origin
    }

    pub fn is_frozen(&self) -> bool {
        self.upload != UploadPhase::Idle
    }

    pub fn upload_phase(&self) -> UploadPhase {
        self.upload
    }

    pub fn active_bypasses(&self) -> &[Bypass] {
        &self.bypasses
    }

    /// Allocate an id for a new generic bypass
    pub fn next_bypass_id(&mut self) -> BypassId {
        let id = BypassId(self.next_bypass_id);
        self.next_bypass_id += 1;
        id
    }

    pub(crate) fn push_bypass(&mut self, kind: BypassKind) -> BypassId {
        let id = self.next_bypass_id();
        self.bypasses.push(Bypass { id, kind });
        id
    }

    /// Metadata is still loading and the route cannot select without it
    pub fn metadata_loading(&self) -> bool {
        self.inputs.metadata.is_none() && !self.route.example
    }

    /// Metadata for selection purposes; example routes treat loading as empty
    pub(crate) fn effective_metadata(&self) -> Option<SketchMetadata> {
        match &self.inputs.metadata {
            Some(metadata) => Some(metadata.clone()),
            None if self.route.example => Some(SketchMetadata::default()),
            None => None,
        }
    }

    /// USB ports with borrowed identities applied
    pub fn usb_candidates(&self) -> Vec<DetectedDevice> {
        self.inputs
            .ports
            .iter()
            .map(|port| match self.overlays.get(&port.port_board_id) {
                Some(overlay) => overlay.apply(port),
                None => port.clone(),
            })
            .collect()
    }

    /// USB ports followed by online IoT devices
    pub fn candidates(&self) -> Vec<DetectedDevice> {
        let mut candidates = self.usb_candidates();
        candidates.extend(self.inputs.iot.online.iter().map(|d| d.device.clone()));
        candidates
    }

    /// Every endpoint id currently visible, USB and IoT in both groups
    pub(crate) fn endpoint_ids(&self) -> BTreeSet<String> {
        self.inputs
            .ports
            .iter()
            .map(|p| p.port_board_id.clone())
            .chain(
                self.inputs
                    .iot
                    .online
                    .iter()
                    .chain(self.inputs.iot.offline.iter())
                    .map(|d| d.port_board_id().to_string()),
            )
            .collect()
    }

    /// Detected USB boards as the host should list them
    pub fn detected_devices(&self) -> Vec<DetectedDevice> {
        self.usb_candidates()
    }

    /// IoT groups with `is_associated` set on the selected endpoint
    pub fn iot_devices_with_association(&self) -> IotDevicesGroups {
        let selected = self.selection.selected_port_board_id.as_deref();
        let decorate = |devices: &[IotDevice]| -> Vec<IotDevice> {
            devices
                .iter()
                .map(|d| IotDevice {
                    is_associated: Some(selected == Some(d.port_board_id())),
                    ..d.clone()
                })
                .collect()
        };
        IotDevicesGroups {
            online: decorate(&self.inputs.iot.online),
            offline: decorate(&self.inputs.iot.offline),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Selection mutations
    // ─────────────────────────────────────────────────────────

    /// Set board identity; flavour hints only change with the base
    pub(crate) fn set_board(
        &mut self,
        fqbn: Option<&str>,
        name: Option<String>,
        architecture: Option<String>,
    ) {
        let parsed = fqbn.and_then(|f| f.parse::<Fqbn>().ok());
        let base = parsed
            .as_ref()
            .map(Fqbn::base)
            .or_else(|| fqbn.map(str::to_string))
            .filter(|b| !b.is_empty());

        if base != self.board_fqbn {
            self.flavour_hints = parsed.map(|p| p.config).unwrap_or_default();
        } else if let Some(parsed) = parsed.filter(Fqbn::has_config) {
            // Same board with an explicit configuration: reseed from it
            self.flavour_hints = parsed.config;
            self.flavour_base = None;
        }

        self.board_fqbn = base;
        self.selection.selected_board = name;
        self.selection.selected_architecture = architecture;
    }

    pub(crate) fn select_usb(&mut self, port: &DetectedDevice, origin: SelectionOrigin) {
        self.set_board(
            port.fqbn.as_deref(),
            port.name.clone(),
            port.architecture.clone(),
        );
        self.selection.selected_port = Some(port.port_name.clone());
        self.selection.selected_port_board_id = Some(port.port_board_id.clone());
        self.selection.selected_iot_device_id = None;
        self.selection.selected_board_is_iot = false;
        self.origin = Some(origin);
    }

    pub(crate) fn select_iot(&mut self, device: &IotDevice, origin: SelectionOrigin) {
        self.set_board(
            device.device.fqbn.as_deref(),
            device.device.name.clone(),
            device.device.architecture.clone(),
        );
        self.selection.selected_port = Some(device.device.port_name.clone());
        self.selection.selected_port_board_id = Some(device.port_board_id().to_string());
        self.selection.selected_iot_device_id = Some(device.id.clone());
        self.selection.selected_board_is_iot = true;
        self.origin = Some(origin);
    }

    /// Drop the port, keep the board
    pub(crate) fn clear_port(&mut self) {
        self.selection.selected_port = None;
        self.selection.selected_port_board_id = None;
        self.selection.selected_iot_device_id = None;
        self.selection.selected_board_is_iot = false;
        self.selection.selected_device_alt_port_board_id = None;
        self.origin = None;
        self.user_switched_alt = false;
    }

    /// Drop board and port
    pub(crate) fn clear_selection(&mut self) {
        self.clear_port();
        self.board_fqbn = None;
        self.flavour_hints.clear();
        self.flavour_base = None;
        self.selection.selected_board_flavour_options = None;
        self.selection.selected_board = None;
        self.selection.selected_architecture = None;
        self.selection.selected_fqbn = None;
    }

    /// Forget everything tied to the previous route or session
    pub(crate) fn reset_session(&mut self) {
        self.selection = SelectionState::default();
        self.board_fqbn = None;
        self.flavour_hints.clear();
        self.flavour_base = None;
        self.origin = None;
        self.known_ids = None;
        self.bypasses.clear();
        self.user_switched_alt = false;
        self.overlays.clear();
        self.upload = UploadPhase::Idle;
        self.upload_generation += 1;
        self.prompt_gate.reset();
    }
}
