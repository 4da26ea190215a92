mod test_bvh_basic;
mod test_curve_basic;
mod test_mesh_sanity;
mod test_tube_basic;
