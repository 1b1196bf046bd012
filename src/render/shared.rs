pub(crate) const SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    ambient: vec4<f32>,
    directional_direction: vec4<f32>,
    directional_color: vec4<f32>,
    point_position: vec4<f32>,
    point_color: vec4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    base_color: vec4<f32>,
    emissive: vec4<f32>,
    surface: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;

    out.normal = normalize(world_normal);
    out.color = input.color;
    return out;
}

fn phong(normal: vec3<f32>, light_dir: vec3<f32>, view_dir: vec3<f32>, color: vec4<f32>) -> vec3<f32> {
    let diffuse = max(dot(normal, light_dir), 0.0);
    let half_dir = normalize(light_dir + view_dir);
    let specular = pow(max(dot(normal, half_dir), 0.0), object.surface.y);
    return (diffuse + specular * 0.5) * color.rgb * color.w;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let view_dir = normalize(globals.camera_position.xyz - input.world_pos);
    let point_dir = normalize(globals.point_position.xyz - input.world_pos);

    let albedo = mix(object.base_color.rgb, input.color, object.surface.x);
    var lighting = globals.ambient.rgb;
    lighting += phong(normal, globals.directional_direction.xyz, view_dir, globals.directional_color);
    lighting += phong(normal, point_dir, view_dir, globals.point_color);

    let emissive = object.emissive.rgb * object.emissive.w;
    return vec4<f32>(albedo * lighting + emissive, object.base_color.a);
}
"#;
