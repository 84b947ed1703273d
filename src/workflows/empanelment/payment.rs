use chrono::NaiveDate;

use super::domain::{Application, DeviceTypeId, PaymentRecord};

/// Errors raised by the fee-settlement gate.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("device type '{0}' was not selected on this application")]
    UnknownDeviceType(DeviceTypeId),
    #[error("fee already settled for device type '{0}'")]
    DuplicatePayment(DeviceTypeId),
}

/// Mark the empanelment fee settled for one selected device type. Called by
/// the payment collaborator when the processor confirms settlement.
pub fn record_payment(
    application: &mut Application,
    device_type: DeviceTypeId,
    amount_inr: u32,
    reference: String,
    settled_on: NaiveDate,
) -> Result<(), PaymentError> {
    if !application.selected_device_types.contains(&device_type) {
        return Err(PaymentError::UnknownDeviceType(device_type));
    }
    if application.payments.contains_key(&device_type) {
        return Err(PaymentError::DuplicatePayment(device_type));
    }

    application.payments.insert(
        device_type,
        PaymentRecord {
            amount_inr,
            reference,
            settled_on,
        },
    );
    Ok(())
}

/// True when every selected device type has a settled fee.
pub fn is_satisfied(application: &Application) -> bool {
    application
        .selected_device_types
        .iter()
        .all(|device_type| application.payments.contains_key(device_type))
}

/// Selected device types still awaiting settlement, in catalogue order.
pub fn unpaid_device_types(application: &Application) -> Vec<DeviceTypeId> {
    application
        .selected_device_types
        .iter()
        .filter(|device_type| !application.payments.contains_key(*device_type))
        .cloned()
        .collect()
}
