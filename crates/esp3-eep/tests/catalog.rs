use esp3_eep::bits::{bits_to_bytes, bytes_to_bits};
use esp3_eep::{FieldInput, FieldValue, ProfileCatalog, ProfileId, ProfileRegistry};

fn registry() -> ProfileRegistry {
    ProfileRegistry::builtin().unwrap()
}

fn value_of<'a>(fields: &'a [esp3_eep::DecodedField], shortcut: &str) -> &'a FieldValue {
    &fields
        .iter()
        .find(|field| field.shortcut == shortcut)
        .unwrap_or_else(|| panic!("missing field {shortcut}"))
        .value
}

#[test]
fn decode_temperature_sensor() {
    let registry = registry();
    let resolved = registry
        .find_profile(&ProfileId::new(0xA5, 0x02, 0x05), None, None)
        .unwrap();

    let bits = bytes_to_bits(&[0x00, 0x00, 0x80, 0x08], 32);
    let fields = resolved.decode(&bits, &bytes_to_bits(&[0x00], 8));

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].raw_value, 0x80);
    let celsius = fields[0].value.as_f64().unwrap();
    assert!((celsius - 19.921_568).abs() < 1e-3, "{celsius}");
    assert_eq!(fields[0].unit.as_deref(), Some("°C"));
}

#[test]
fn decode_rocker_switch_with_status() {
    let registry = registry();
    let resolved = registry
        .find_profile(&ProfileId::new(0xF6, 0x02, 0x01), None, None)
        .unwrap();

    let fields = resolved.decode(&bytes_to_bits(&[0x70], 8), &bytes_to_bits(&[0x30], 8));
    assert_eq!(value_of(&fields, "R1").as_label(), Some("Button BO"));
    assert_eq!(value_of(&fields, "EB").as_label(), Some("pressed"));
    assert_eq!(value_of(&fields, "T21").as_flag(), Some(true));
    assert_eq!(value_of(&fields, "NU").as_flag(), Some(true));
}

#[test]
fn vld_blocks_resolved_by_command() {
    let registry = registry();
    let id = ProfileId::new(0xD2, 0x01, 0x01);

    let set_output = registry.find_profile(&id, None, Some(1)).unwrap();
    assert!(set_output.block.has_field("DV"));
    assert_eq!(set_output.block.byte_len(), 3);

    let status = registry.find_profile(&id, None, Some(4)).unwrap();
    assert!(status.block.has_field("PF"));

    assert!(registry.find_profile(&id, None, Some(9)).is_none());
    assert_eq!(
        registry.find_profile(&id, None, None).unwrap().block,
        set_output.block
    );
}

#[test]
fn vld_encode_switch_on() {
    let registry = registry();
    let resolved = registry
        .find_profile(&ProfileId::new(0xD2, 0x01, 0x01), None, Some(1))
        .unwrap();

    let mut bits = vec![false; 24];
    let mut status = vec![false; 8];
    let cmd = FieldInput::Raw(1);
    let io = FieldInput::from("All output channels supported by the device");
    let ov = FieldInput::from("Output value 100% or ON");
    resolved
        .encode(
            &mut bits,
            &mut status,
            [("CMD", &cmd), ("IO", &io), ("OV", &ov)],
        )
        .unwrap();

    assert_eq!(bits_to_bytes(&bits), vec![0x01, 0x1E, 0x64]);
}

#[test]
fn msc_profile_decodes_reassembled_payload() {
    let registry = registry();
    let id: ProfileId = "D1079-01-00".parse().unwrap();
    let payload = [
        0x07, 0x90, 0x01, 0x02, 0x00, 0x04, 0x20, 0x1C, 0x1C, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];
    let bits = bytes_to_bits(&payload, payload.len() * 8);

    let profile = registry.profile(&id).unwrap();
    assert_eq!(profile.command_of(&bits), Some(0));

    let resolved = registry.find_profile(&id, None, Some(0)).unwrap();
    let fields = resolved.decode(&bits, &bytes_to_bits(&[0x00], 8));

    assert_eq!(value_of(&fields, "MF").as_label(), Some("Ventilairsec"));
    assert_eq!(value_of(&fields, "VACS").as_label(), Some("Off"));
    assert_eq!(value_of(&fields, "BOOST").as_f64(), Some(4.0));
    assert_eq!(value_of(&fields, "TEMPEL").as_f64(), Some(32.0));
    assert_eq!(value_of(&fields, "TEMPSOUF").as_f64(), Some(28.0));
    assert_eq!(value_of(&fields, "COMMAND").as_f64(), Some(1.0));
}

#[test]
fn field_metadata_across_blocks() {
    let registry = registry();
    let id = ProfileId::new(ProfileId::msc_rorg(0x079), 0x01, 0x00);

    let fields = registry.fields(&id);
    assert!(fields.contains_key("TEMPEL"));
    assert!(fields.contains_key("TEMP2"));
    assert!(fields.contains_key("FLOW"));

    let mf = registry.field_metadata(&id, "MF").unwrap();
    assert_eq!(mf.name, "Manufacturer ID");
    assert_eq!(mf.enum_map.get(&0x079).map(String::as_str), Some("Ventilairsec"));

    let flow = registry.field_metadata(&id, "FLOW").unwrap();
    assert_eq!(flow.unit.as_deref(), Some("m³/h"));
    assert!(flow.enum_map.is_empty());
}

#[test]
fn profiles_serialize_back_to_documents() {
    let registry = registry();
    for profile in registry.profiles() {
        let json = serde_json::to_string(profile).unwrap();
        let mut copy = ProfileRegistry::new();
        copy.register(&json).unwrap();
        assert_eq!(copy.get(&profile.id), Some(profile));
    }
}
