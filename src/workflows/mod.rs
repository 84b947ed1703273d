pub mod empanelment;
